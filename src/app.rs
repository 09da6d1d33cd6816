/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Main eframe::App implementation: product entry form plus the two scan dialogs

use eframe::egui;

use crate::barcode::BarcodeScanner;
use crate::dialog::{BarcodeDialog, DialogProps, ExpiryDialog};
use crate::expiry::ExpiryScanner;
use crate::model::ProductForm;
use crate::platform;

pub struct ShelfScanApp {
    form: ProductForm,
    barcode_dialog: BarcodeDialog,
    expiry_dialog: ExpiryDialog,
    barcode_open: bool,
    expiry_open: bool,
}

impl ShelfScanApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = platform::load_config();
        log::info!("Scanner configuration: {:?}", config);
        Self {
            form: ProductForm::new(),
            barcode_dialog: BarcodeDialog::new(BarcodeScanner::new(
                platform::camera(),
                platform::detectors(),
                config.clone(),
            )),
            expiry_dialog: ExpiryDialog::new(ExpiryScanner::new(
                platform::camera(),
                platform::recognizer(),
                config,
            )),
            barcode_open: false,
            expiry_open: false,
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        let mut closed = false;
        let mut detected = None;
        self.barcode_dialog.show(
            ctx,
            DialogProps {
                open: self.barcode_open,
                on_close: &mut || {
                    closed = true;
                },
                on_detected: &mut |value: String| {
                    detected = Some(value);
                },
            },
        );
        if let Some(value) = detected {
            self.form.status_message = format!("Barcode scanned: {}", value);
            self.form.barcode = value;
        }
        if closed {
            self.barcode_open = false;
        }

        let mut closed = false;
        let mut detected = None;
        self.expiry_dialog.show(
            ctx,
            DialogProps {
                open: self.expiry_open,
                on_close: &mut || {
                    closed = true;
                },
                on_detected: &mut |value: String| {
                    detected = Some(value);
                },
            },
        );
        if let Some(value) = detected {
            self.form.status_message = format!("Expiry date recognized: {}", value);
            self.form.expiry_date = value;
        }
        if closed {
            self.expiry_open = false;
        }
    }
}

impl eframe::App for ShelfScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Top panel: title + status
        egui::Panel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("Shelf Scan");
            ui.add_space(2.0);
            ui.label(&self.form.status_message);
            ui.add_space(2.0);
        });

        let scanning = self.barcode_open || self.expiry_open;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Grid::new("product_grid")
                .num_columns(3)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Product");
                    ui.add(egui::TextEdit::singleline(&mut self.form.name).desired_width(240.0));
                    ui.end_row();

                    ui.label("Barcode");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.barcode).desired_width(240.0),
                    );
                    if ui
                        .add_enabled(!scanning, egui::Button::new("Scan barcode"))
                        .clicked()
                    {
                        self.barcode_open = true;
                    }
                    ui.end_row();

                    ui.label("Expiry date");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.expiry_date)
                            .hint_text("YYYY-MM-DD")
                            .desired_width(240.0),
                    );
                    if ui
                        .add_enabled(!scanning, egui::Button::new("Scan expiry date"))
                        .clicked()
                    {
                        self.expiry_open = true;
                    }
                    ui.end_row();
                });

            if !self.form.expiry_date.is_empty() && !self.form.expiry_date_is_valid() {
                ui.colored_label(
                    egui::Color32::from_rgb(255, 100, 100),
                    "Expiry date must be a real date in YYYY-MM-DD format",
                );
            }
        });

        self.show_dialogs(ctx);
    }
}
