/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Barcode scan loop.
//!
//! `Idle -> Starting -> Scanning -> Success -> Idle`, or `Starting -> Error`.
//! `tick()` is called once per repaint; the dialog keeps requesting repaints
//! only while `wants_next_frame()` holds, so the loop ends by itself once the
//! scanner leaves the active states.

use std::time::Duration;

use crate::config::ScanConfig;
use crate::detector::{Detection, Detector, DetectorBackend};
use crate::error::ScanError;
use crate::model::{DebounceState, DetectionResult, Frame};
use crate::session::{Camera, CaptureSession};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Starting,
    Scanning,
    /// Barcode accepted, delivered once `deliver_at` is reached
    Success { value: String, deliver_at: Duration },
    Error(ScanError),
}

pub struct BarcodeScanner {
    config: ScanConfig,
    session: CaptureSession,
    backend: Box<dyn DetectorBackend>,
    detector: Option<Box<dyn Detector>>,
    phase: ScanPhase,
    debounce: DebounceState,
    /// Set once a value went out during the current open/close cycle
    delivered: bool,
    last_result: Option<DetectionResult>,
}

impl BarcodeScanner {
    pub fn new(
        camera: Box<dyn Camera>,
        backend: Box<dyn DetectorBackend>,
        config: ScanConfig,
    ) -> Self {
        Self {
            session: CaptureSession::new(camera, config.facing),
            config,
            backend,
            detector: None,
            phase: ScanPhase::Idle,
            debounce: DebounceState::default(),
            delivered: false,
            last_result: None,
        }
    }

    /// Dialog became visible
    pub fn open(&mut self) {
        self.delivered = false;
        self.begin();
    }

    /// Dialog hidden or torn down
    pub fn close(&mut self) {
        self.stop_detector();
        self.session.stop();
        if self.phase != ScanPhase::Idle {
            log::info!("Barcode scanner closed");
        }
        self.phase = ScanPhase::Idle;
    }

    /// Start the camera again after an error
    pub fn retry(&mut self) {
        if matches!(self.phase, ScanPhase::Error(_)) {
            self.begin();
        }
    }

    pub fn phase(&self) -> &ScanPhase {
        &self.phase
    }

    pub fn last_result(&self) -> Option<&DetectionResult> {
        self.last_result.as_ref()
    }

    pub fn wants_next_frame(&self) -> bool {
        matches!(
            self.phase,
            ScanPhase::Starting | ScanPhase::Scanning | ScanPhase::Success { .. }
        )
    }

    /// Also true while a camera request from a closed session is still
    /// pending, so a late grant gets released without waiting for input
    pub fn needs_repaint(&self) -> bool {
        self.wants_next_frame() || !self.session.is_settled()
    }

    pub fn preview_frame(&self, max_width: u32) -> Option<Frame> {
        self.session.preview_frame(max_width)
    }

    /// Advance the loop by one frame. Returns the barcode once its
    /// confirmation delay has passed; the session is already released then.
    pub fn tick(&mut self, now: Duration) -> Option<String> {
        match self.phase {
            ScanPhase::Starting => {
                self.tick_starting();
                None
            }
            ScanPhase::Scanning => {
                self.tick_scanning(now);
                None
            }
            ScanPhase::Success { .. } => self.tick_success(now),
            ScanPhase::Idle | ScanPhase::Error(_) => {
                // Only releases streams granted after close
                self.session.poll();
                None
            }
        }
    }

    fn begin(&mut self) {
        self.stop_detector();
        self.phase = ScanPhase::Starting;
        self.session.start();
    }

    fn tick_starting(&mut self) {
        match self.session.poll() {
            Some(Ok(())) => {
                let Some(stream) = self.session.stream() else {
                    return;
                };
                match self.backend.select(stream) {
                    Ok(detector) => {
                        log::info!("Scanning for barcodes with {} detector", detector.name());
                        self.detector = Some(detector);
                        self.phase = ScanPhase::Scanning;
                    }
                    Err(e) => {
                        log::error!("No barcode detector for this camera: {}", e);
                        self.session.stop();
                        self.phase = ScanPhase::Error(e);
                    }
                }
            }
            Some(Err(e)) => {
                log::warn!("Barcode scanner cannot start: {}", e);
                self.phase = ScanPhase::Error(e);
            }
            None => {}
        }
    }

    fn tick_scanning(&mut self, now: Duration) {
        let batches = match (self.detector.as_mut(), self.session.stream()) {
            (Some(detector), Some(stream)) => detector.poll(stream),
            _ => return,
        };

        for batch in batches {
            match batch {
                Ok(detections) => {
                    if let Some(first) = detections.into_iter().next()
                        && self.accept(first, now)
                    {
                        break;
                    }
                }
                // Misses and decoder hiccups are expected on individual frames
                Err(e) => log::debug!("Barcode detection failed on this frame: {}", e),
            }
        }
    }

    /// Debounce check and the move to `Success` in one step
    fn accept(&mut self, detection: Detection, now: Duration) -> bool {
        if self.phase != ScanPhase::Scanning {
            return false;
        }
        if !self
            .debounce
            .try_accept(now, self.config.debounce_window())
        {
            log::debug!("Ignoring repeated barcode '{}'", detection.raw_value);
            return false;
        }

        log::info!(
            "Barcode detected: {} ({})",
            detection.raw_value,
            detection.format.as_deref().unwrap_or("unknown format")
        );
        self.stop_detector();
        self.phase = ScanPhase::Success {
            value: detection.raw_value.clone(),
            deliver_at: now + self.config.success_delay(),
        };
        self.last_result = Some(DetectionResult {
            raw_value: detection.raw_value,
            format: detection.format,
            timestamp: now,
        });
        true
    }

    fn tick_success(&mut self, now: Duration) -> Option<String> {
        let ScanPhase::Success { value, deliver_at } = &self.phase else {
            return None;
        };
        if now < *deliver_at {
            return None;
        }
        let value = value.clone();
        self.session.stop();
        self.phase = ScanPhase::Idle;
        if self.delivered {
            return None;
        }
        self.delivered = true;
        Some(value)
    }

    fn stop_detector(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            detector.stop();
        }
    }
}

impl Drop for BarcodeScanner {
    fn drop(&mut self) {
        self.stop_detector();
    }
}
