/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Expiry date capture: one still frame per button press, OCR, then date
//! extraction. Recognition may take seconds, so it is submitted and the
//! answer is picked up by `tick()` on a later frame.

use std::time::Duration;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::inbox::{Inbox, Reply};
use crate::model::{CandidateDate, ExtractionOutcome, Frame, RasterImage};
use crate::parser;
use crate::session::{Camera, CaptureSession};

/// Recognized text, or the recognizer's own error message
pub type RecognitionResult = Result<String, String>;

/// Text recognition capability of the host
pub trait Recognizer {
    fn recognize(&self, image: RasterImage, language: &str, reply: Reply<RecognitionResult>);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionEvent {
    /// A date was chosen and the camera released
    Detected(CandidateDate),
    /// `NoMatchFound` or `RecognitionFailure`; the user may capture again
    Failed(ScanError),
}

struct PendingRecognition {
    generation: u64,
    submitted_at: Duration,
}

pub struct ExpiryScanner {
    config: ScanConfig,
    session: CaptureSession,
    recognizer: Box<dyn Recognizer>,
    results: Inbox<RecognitionResult>,
    /// Bumped on open/close/timeout; replies from older generations are stale
    generation: u64,
    pending: Option<PendingRecognition>,
    camera_error: Option<ScanError>,
    last_error: Option<ScanError>,
    last_outcome: Option<ExtractionOutcome>,
}

impl ExpiryScanner {
    pub fn new(camera: Box<dyn Camera>, recognizer: Box<dyn Recognizer>, config: ScanConfig) -> Self {
        Self {
            session: CaptureSession::new(camera, config.facing),
            config,
            recognizer,
            results: Inbox::new(),
            generation: 0,
            pending: None,
            camera_error: None,
            last_error: None,
            last_outcome: None,
        }
    }

    pub fn open(&mut self) {
        self.reset();
        self.session.start();
    }

    pub fn close(&mut self) {
        if self.pending.is_some() {
            log::info!("Expiry scanner closed with recognition pending; result will be ignored");
        }
        self.reset();
        self.session.stop();
    }

    pub fn retry_camera(&mut self) {
        if self.camera_error.take().is_some() {
            self.session.start();
        }
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.camera_error = None;
        self.last_error = None;
        self.last_outcome = None;
    }

    pub fn is_scanning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_starting(&self) -> bool {
        self.session.is_requesting()
    }

    /// Camera is live and no recognition is outstanding
    pub fn can_capture(&self) -> bool {
        self.session.is_active() && self.pending.is_none()
    }

    pub fn camera_error(&self) -> Option<&ScanError> {
        self.camera_error.as_ref()
    }

    /// Error of the last capture attempt, cleared by the next capture
    pub fn last_error(&self) -> Option<&ScanError> {
        self.last_error.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&ExtractionOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn needs_repaint(&self) -> bool {
        self.session.is_requesting()
            || self.session.is_active()
            || self.pending.is_some()
            || !self.session.is_settled()
    }

    pub fn preview_frame(&self, max_width: u32) -> Option<Frame> {
        self.session.preview_frame(max_width)
    }

    /// Grab the current frame and hand it to the recognizer.
    /// Returns `false` without doing anything when there is nothing to capture.
    pub fn capture(&mut self, now: Duration) -> bool {
        if !self.can_capture() {
            return false;
        }
        let Some(frame) = self.session.latest_frame() else {
            log::debug!("No video frame available yet");
            return false;
        };
        let raster = match RasterImage::from_frame(&frame) {
            Ok(raster) => raster,
            Err(e) => {
                log::error!("Cannot prepare frame for recognition: {}", e);
                self.last_error = Some(ScanError::RecognitionFailure(e));
                return false;
            }
        };

        self.generation += 1;
        self.pending = Some(PendingRecognition {
            generation: self.generation,
            submitted_at: now,
        });
        self.last_error = None;
        self.last_outcome = None;
        log::info!(
            "Submitting {}x{} frame for text recognition",
            raster.width,
            raster.height
        );
        self.recognizer.recognize(
            raster,
            &self.config.ocr_language,
            self.results.reply(self.generation),
        );
        true
    }

    /// Pick up camera and recognizer answers
    pub fn tick(&mut self, now: Duration) -> Option<ExtractionEvent> {
        if let Some(Err(e)) = self.session.poll() {
            self.camera_error = Some(e);
        }

        let mut event = None;
        for reply in self.results.drain() {
            let current = self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.generation == reply.generation);
            if !current {
                log::debug!("Discarding stale recognition result");
                continue;
            }
            self.pending = None;
            event = Some(self.finish(reply.value));
        }

        if event.is_none()
            && let Some(pending) = &self.pending
            && let Some(timeout) = self.config.ocr_timeout()
            && now.saturating_sub(pending.submitted_at) >= timeout
        {
            log::warn!("Text recognition timed out after {:?}", timeout);
            self.pending = None;
            self.generation += 1;
            event = Some(self.fail(ScanError::RecognitionFailure("timed out".into())));
        }
        event
    }

    fn finish(&mut self, result: RecognitionResult) -> ExtractionEvent {
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                log::error!("Text recognition failed: {}", e);
                return self.fail(ScanError::RecognitionFailure(e));
            }
        };

        let outcome = parser::extract_expiry_dates(&text, &self.config);
        let selected = outcome.selected().cloned();
        if let ExtractionOutcome::MultipleFound(candidates) = &outcome {
            log::info!(
                "{} dates recognized, using the first one",
                candidates.len()
            );
        }
        self.last_outcome = Some(outcome);

        match selected {
            Some(candidate) => {
                log::info!("Expiry date recognized: {}", candidate.iso_date());
                self.session.stop();
                ExtractionEvent::Detected(candidate)
            }
            None => {
                log::info!("No expiry date in recognized text");
                self.fail(ScanError::NoMatchFound)
            }
        }
    }

    fn fail(&mut self, error: ScanError) -> ExtractionEvent {
        self.last_error = Some(error.clone());
        ExtractionEvent::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, FakeRecognizer};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn ready(camera: &FakeCamera, recognizer: &FakeRecognizer) -> ExpiryScanner {
        let mut scanner = ExpiryScanner::new(
            Box::new(camera.clone()),
            Box::new(recognizer.clone()),
            ScanConfig::default(),
        );
        scanner.open();
        assert_eq!(scanner.tick(ms(0)), None);
        assert!(scanner.can_capture());
        scanner
    }

    fn detected_iso(event: Option<ExtractionEvent>) -> String {
        match event {
            Some(ExtractionEvent::Detected(candidate)) => candidate.iso_date(),
            other => panic!("expected a detected date, got {:?}", other),
        }
    }

    #[test]
    fn single_date_is_delivered_and_camera_released() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        assert!(scanner.capture(ms(1_000)));
        assert!(scanner.is_scanning());
        assert_eq!(recognizer.languages(), vec!["eng".to_string()]);
        assert_eq!(recognizer.last_image_size(), Some((4, 2)));
        assert_eq!(scanner.tick(ms(1_500)), None);

        recognizer.resolve_next(Ok("BEST BEFORE\n31-12-2025\nLOT 4471".into()));
        assert_eq!(detected_iso(scanner.tick(ms(4_000))), "2025-12-31");
        assert!(!scanner.is_scanning());
        assert_eq!(camera.open_streams(), 0);
    }

    #[test]
    fn several_dates_deliver_the_first_in_scan_order() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        scanner.capture(ms(0));
        recognizer.resolve_next(Ok("exp 01/02/2030 also 2031-03-04".into()));
        assert_eq!(detected_iso(scanner.tick(ms(100))), "2030-02-01");
        assert!(matches!(
            scanner.last_outcome(),
            Some(ExtractionOutcome::MultipleFound(candidates)) if candidates.len() == 2
        ));
    }

    #[test]
    fn no_date_keeps_camera_for_another_try() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        scanner.capture(ms(0));
        recognizer.resolve_next(Ok("NET WT 500 g".into()));
        assert_eq!(
            scanner.tick(ms(100)),
            Some(ExtractionEvent::Failed(ScanError::NoMatchFound))
        );
        assert!(!scanner.is_scanning());
        assert_eq!(scanner.last_error(), Some(&ScanError::NoMatchFound));
        assert!(scanner.can_capture());
        assert_eq!(camera.open_streams(), 1);

        assert!(scanner.capture(ms(200)));
        assert_eq!(scanner.last_error(), None);
    }

    #[test]
    fn recognizer_failure_clears_scanning() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        scanner.capture(ms(0));
        recognizer.resolve_next(Err("worker crashed".into()));
        assert_eq!(
            scanner.tick(ms(100)),
            Some(ExtractionEvent::Failed(ScanError::RecognitionFailure(
                "worker crashed".into()
            )))
        );
        assert!(!scanner.is_scanning());
    }

    #[test]
    fn capture_is_a_no_op_without_camera_or_frame() {
        let camera = FakeCamera::deferred();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ExpiryScanner::new(
            Box::new(camera.clone()),
            Box::new(recognizer.clone()),
            ScanConfig::default(),
        );
        scanner.open();
        assert!(scanner.is_starting());
        assert!(!scanner.capture(ms(0)));

        camera.set_frame(None);
        camera.grant_pending();
        scanner.tick(ms(10));
        assert!(!scanner.capture(ms(20)));
        assert!(!scanner.is_scanning());
        assert_eq!(recognizer.submissions(), 0);
    }

    #[test]
    fn only_one_recognition_at_a_time() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        assert!(scanner.capture(ms(0)));
        assert!(!scanner.capture(ms(10)));
        assert_eq!(recognizer.submissions(), 1);
    }

    #[test]
    fn result_after_close_is_discarded() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        scanner.capture(ms(0));
        scanner.close();
        assert_eq!(camera.open_streams(), 0);
        assert!(!scanner.is_scanning());

        recognizer.resolve_next(Ok("31/12/2030".into()));
        assert_eq!(scanner.tick(ms(5_000)), None);

        // Reopening does not revive the old request either
        scanner.open();
        assert_eq!(scanner.tick(ms(6_000)), None);
        assert!(!scanner.is_scanning());
    }

    #[test]
    fn hung_recognizer_times_out() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ready(&camera, &recognizer);

        scanner.capture(ms(1_000));
        assert_eq!(scanner.tick(ms(30_999)), None);
        assert_eq!(
            scanner.tick(ms(31_000)),
            Some(ExtractionEvent::Failed(ScanError::RecognitionFailure(
                "timed out".into()
            )))
        );
        assert!(!scanner.is_scanning());

        recognizer.resolve_next(Ok("31/12/2030".into()));
        assert_eq!(scanner.tick(ms(32_000)), None);
    }

    #[test]
    fn without_timeout_the_recognizer_is_awaited() {
        let camera = FakeCamera::granting();
        let recognizer = FakeRecognizer::default();
        let mut scanner = ExpiryScanner::new(
            Box::new(camera.clone()),
            Box::new(recognizer.clone()),
            ScanConfig {
                ocr_timeout_ms: None,
                ..ScanConfig::default()
            },
        );
        scanner.open();
        scanner.tick(ms(0));
        scanner.capture(ms(0));
        assert_eq!(scanner.tick(ms(600_000)), None);
        assert!(scanner.is_scanning());
    }

    #[test]
    fn camera_denied_blocks_capture() {
        let camera = FakeCamera::failing(ScanError::PermissionDenied);
        let recognizer = FakeRecognizer::default();
        let mut scanner = ExpiryScanner::new(
            Box::new(camera.clone()),
            Box::new(recognizer.clone()),
            ScanConfig::default(),
        );
        scanner.open();
        assert_eq!(scanner.tick(ms(0)), None);
        assert_eq!(scanner.camera_error(), Some(&ScanError::PermissionDenied));
        assert!(!scanner.capture(ms(10)));

        scanner.retry_camera();
        assert!(scanner.camera_error().is_none());
        assert_eq!(camera.requested_facings().len(), 2);
    }

    #[test]
    fn missing_camera_can_be_retried() {
        let camera = FakeCamera::failing(ScanError::DeviceNotFound);
        let recognizer = FakeRecognizer::default();
        let mut scanner = ExpiryScanner::new(
            Box::new(camera.clone()),
            Box::new(recognizer.clone()),
            ScanConfig::default(),
        );
        scanner.open();
        scanner.tick(ms(0));
        assert_eq!(scanner.camera_error(), Some(&ScanError::DeviceNotFound));

        camera.plug_in();
        scanner.retry_camera();
        scanner.tick(ms(16));
        assert!(scanner.camera_error().is_none());
        assert!(scanner.can_capture());
    }
}
