/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Scan dialogs shown as egui windows.
//!
//! Both take the same props: the parent owns `open`, hears about closing
//! through `on_close` and receives the scanned value through `on_detected`,
//! which is always followed by `on_close`.

use std::time::Duration;

use eframe::egui;

use crate::barcode::{BarcodeScanner, ScanPhase};
use crate::expiry::{ExpiryScanner, ExtractionEvent};
use crate::model::{ExtractionOutcome, Frame};

pub struct DialogProps<'a> {
    pub open: bool,
    pub on_close: &'a mut dyn FnMut(),
    pub on_detected: &'a mut dyn FnMut(String),
}

const SUCCESS_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);

const PREVIEW_WIDTH: u32 = 480;
/// About 15 preview updates per second
const PREVIEW_INTERVAL: Duration = Duration::from_millis(66);

fn frame_time(ctx: &egui::Context) -> Duration {
    Duration::from_secs_f64(ctx.input(|i| i.time).max(0.0))
}

/// Button pressed inside a dialog window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UiAction {
    Capture,
    Retry,
    Cancel,
}

/// Camera frames uploaded into one reusable texture
struct VideoPreview {
    name: &'static str,
    texture: Option<egui::TextureHandle>,
    refreshed_at: Option<Duration>,
}

impl VideoPreview {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            texture: None,
            refreshed_at: None,
        }
    }

    /// Calls `grab` at most once per `PREVIEW_INTERVAL`
    fn update(
        &mut self,
        ctx: &egui::Context,
        now: Duration,
        grab: impl FnOnce() -> Option<Frame>,
    ) {
        if let Some(last) = self.refreshed_at
            && now.saturating_sub(last) < PREVIEW_INTERVAL
        {
            return;
        }
        let Some(frame) = grab() else {
            return;
        };
        self.refreshed_at = Some(now);
        let size = [frame.width as usize, frame.height as usize];
        if frame.rgba.len() != size[0] * size[1] * 4 {
            log::debug!("Skipping malformed {}x{} frame", frame.width, frame.height);
            return;
        }
        let image = egui::ColorImage::from_rgba_unmultiplied(size, &frame.rgba);
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture(self.name, image, egui::TextureOptions::LINEAR))
            }
        }
    }

    fn clear(&mut self) {
        self.texture = None;
        self.refreshed_at = None;
    }

    fn show(&self, ui: &mut egui::Ui) {
        match &self.texture {
            Some(texture) => {
                let available_width = ui.available_width().min(PREVIEW_WIDTH as f32);
                let [tw, th] = texture.size();
                let scale = available_width / tw as f32;
                ui.image(egui::load::SizedTexture::new(
                    texture.id(),
                    egui::vec2(available_width, th as f32 * scale),
                ));
            }
            None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Waiting for video...");
                });
            }
        }
    }
}

pub struct BarcodeDialog {
    scanner: BarcodeScanner,
    was_open: bool,
    preview: VideoPreview,
}

impl BarcodeDialog {
    pub fn new(scanner: BarcodeScanner) -> Self {
        Self {
            scanner,
            was_open: false,
            preview: VideoPreview::new("barcode_preview"),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, mut props: DialogProps<'_>) {
        self.sync_visibility(props.open);

        let now = frame_time(ctx);
        if let Some(value) = self.scanner.tick(now) {
            (props.on_detected)(value);
            (props.on_close)();
            self.dismiss();
            return;
        }
        // One detection attempt per repaint; stops once scanning ends
        if self.scanner.needs_repaint() {
            ctx.request_repaint();
        }
        if !props.open {
            return;
        }

        let scanner = &self.scanner;
        self.preview
            .update(ctx, now, || scanner.preview_frame(PREVIEW_WIDTH));

        let mut window_open = true;
        let mut action = None;
        egui::Window::new("Scan barcode")
            .open(&mut window_open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                match self.scanner.phase() {
                    ScanPhase::Idle => {}
                    ScanPhase::Starting => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Starting camera...");
                        });
                    }
                    ScanPhase::Scanning => {
                        self.preview.show(ui);
                        ui.label("Point the camera at a barcode");
                    }
                    ScanPhase::Success { value, deliver_at } => {
                        self.preview.show(ui);
                        ui.colored_label(SUCCESS_COLOR, format!("✔ {}", value));
                        if let Some(result) = self.scanner.last_result() {
                            let total = deliver_at.saturating_sub(result.timestamp);
                            let elapsed = now.saturating_sub(result.timestamp);
                            let progress = if total.is_zero() {
                                1.0
                            } else {
                                (elapsed.as_secs_f32() / total.as_secs_f32()).min(1.0)
                            };
                            ui.add(
                                egui::ProgressBar::new(progress)
                                    .text(result.format.as_deref().unwrap_or("barcode")),
                            );
                        }
                    }
                    ScanPhase::Error(e) => {
                        ui.colored_label(ERROR_COLOR, e.user_message());
                        if ui.button("Try again").clicked() {
                            action = Some(UiAction::Retry);
                        }
                    }
                }
                ui.separator();
                if ui.button("Cancel").clicked() {
                    action = Some(UiAction::Cancel);
                }
            });

        if !window_open {
            action = Some(UiAction::Cancel);
        }
        if let Some(action) = action {
            self.apply(action, &mut props);
        }
    }

    fn apply(&mut self, action: UiAction, props: &mut DialogProps<'_>) {
        match action {
            UiAction::Retry => self.scanner.retry(),
            UiAction::Cancel => {
                (props.on_close)();
                self.dismiss();
            }
            // No still capture in the barcode loop
            UiAction::Capture => {}
        }
    }

    fn sync_visibility(&mut self, open: bool) {
        if open && !self.was_open {
            self.scanner.open();
        } else if !open && self.was_open {
            self.scanner.close();
            self.preview.clear();
        }
        self.was_open = open;
    }

    fn dismiss(&mut self) {
        self.scanner.close();
        self.preview.clear();
        self.was_open = false;
    }
}

pub struct ExpiryDialog {
    scanner: ExpiryScanner,
    was_open: bool,
    preview: VideoPreview,
}

impl ExpiryDialog {
    pub fn new(scanner: ExpiryScanner) -> Self {
        Self {
            scanner,
            was_open: false,
            preview: VideoPreview::new("expiry_preview"),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, mut props: DialogProps<'_>) {
        self.sync_visibility(props.open);

        let now = frame_time(ctx);
        match self.scanner.tick(now) {
            Some(ExtractionEvent::Detected(candidate)) => {
                log::info!(
                    "Expiry date {} read as {}",
                    candidate.iso_date(),
                    candidate.source_format
                );
                if let Some(ExtractionOutcome::MultipleFound(candidates)) =
                    self.scanner.last_outcome()
                {
                    log::warn!(
                        "Picked {} out of {} recognized dates",
                        candidate.iso_date(),
                        candidates.len()
                    );
                }
                (props.on_detected)(candidate.iso_date());
                (props.on_close)();
                self.dismiss();
                return;
            }
            // Shown below from `last_error()` until the next capture
            Some(ExtractionEvent::Failed(e)) => log::info!("Expiry scan attempt failed: {}", e),
            None => {}
        }
        if self.scanner.needs_repaint() {
            ctx.request_repaint();
        }
        if !props.open {
            return;
        }

        if !self.scanner.is_scanning() {
            let scanner = &self.scanner;
            self.preview
                .update(ctx, now, || scanner.preview_frame(PREVIEW_WIDTH));
        }

        let mut window_open = true;
        let mut action = None;
        egui::Window::new("Scan expiry date")
            .open(&mut window_open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                if let Some(e) = self.scanner.camera_error() {
                    ui.colored_label(ERROR_COLOR, e.user_message());
                    if ui.button("Try again").clicked() {
                        action = Some(UiAction::Retry);
                    }
                } else if self.scanner.is_starting() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Starting camera...");
                    });
                } else {
                    self.preview.show(ui);
                    ui.label("Hold the printed date inside the frame");
                    ui.horizontal(|ui| {
                        if self.scanner.is_scanning() {
                            ui.spinner();
                            ui.label("Reading date...");
                        } else if ui
                            .add_enabled(self.scanner.can_capture(), egui::Button::new("Capture"))
                            .clicked()
                        {
                            action = Some(UiAction::Capture);
                        }
                    });
                    if let Some(e) = self.scanner.last_error() {
                        ui.colored_label(ERROR_COLOR, e.user_message());
                    }
                }
                ui.separator();
                if ui.button("Cancel").clicked() {
                    action = Some(UiAction::Cancel);
                }
            });

        if !window_open {
            action = Some(UiAction::Cancel);
        }
        if let Some(action) = action {
            self.apply(action, now, &mut props);
        }
    }

    fn apply(&mut self, action: UiAction, now: Duration, props: &mut DialogProps<'_>) {
        match action {
            UiAction::Capture => {
                if !self.scanner.capture(now) {
                    log::debug!("Nothing to capture yet");
                }
            }
            UiAction::Retry => self.scanner.retry_camera(),
            UiAction::Cancel => {
                (props.on_close)();
                self.dismiss();
            }
        }
    }

    fn sync_visibility(&mut self, open: bool) {
        if open && !self.was_open {
            self.scanner.open();
        } else if !open && self.was_open {
            self.scanner.close();
            self.preview.clear();
        }
        self.was_open = open;
    }

    fn dismiss(&mut self) {
        self.scanner.close();
        self.preview.clear();
        self.was_open = false;
    }
}
