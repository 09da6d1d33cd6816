/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Host capabilities for the current target.
//! The web build talks to the browser; the desktop build has no camera or
//! OCR and falls back to manual entry.

use crate::config::ScanConfig;
use crate::detector::DetectorBackend;
use crate::expiry::Recognizer;
use crate::session::Camera;

/// Overrides come from `<script id="scan_config" type="application/json">`
#[cfg(target_arch = "wasm32")]
pub fn load_config() -> ScanConfig {
    let text = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id("scan_config"))
        .and_then(|element| element.text_content());
    ScanConfig::from_override(text.as_deref())
}

#[cfg(target_arch = "wasm32")]
pub fn camera() -> Box<dyn Camera> {
    Box::new(crate::web_camera::WebCamera)
}

#[cfg(target_arch = "wasm32")]
pub fn detectors() -> Box<dyn DetectorBackend> {
    Box::new(crate::web_camera::WebDetectors)
}

#[cfg(target_arch = "wasm32")]
pub fn recognizer() -> Box<dyn Recognizer> {
    Box::new(crate::ocr::TesseractRecognizer)
}

/// Overrides come from the JSON file named by `SHELF_SCAN_CONFIG`
#[cfg(not(target_arch = "wasm32"))]
pub fn load_config() -> ScanConfig {
    let Ok(path) = std::env::var("SHELF_SCAN_CONFIG") else {
        return ScanConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => ScanConfig::from_override(Some(&text)),
        Err(e) => {
            log::warn!("Cannot read scanner configuration {}: {}", path, e);
            ScanConfig::default()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn camera() -> Box<dyn Camera> {
    Box::new(desktop::NoCamera)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn detectors() -> Box<dyn DetectorBackend> {
    Box::new(desktop::NoDetectors)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn recognizer() -> Box<dyn Recognizer> {
    Box::new(desktop::NoRecognizer)
}

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use crate::config::Facing;
    use crate::detector::{DetectionBatch, Detector, DetectorBackend};
    use crate::error::ScanError;
    use crate::expiry::{RecognitionResult, Recognizer};
    use crate::inbox::Reply;
    use crate::model::RasterImage;
    use crate::session::{Camera, StreamResult, VideoStream};

    pub struct NoCamera;

    impl Camera for NoCamera {
        fn request_stream(&self, _facing: Facing, reply: Reply<StreamResult>) {
            log::warn!("Camera capture is only available in the web build");
            reply.send(Err(ScanError::DeviceNotFound));
        }
    }

    pub struct NoDetectors;

    impl DetectorBackend for NoDetectors {
        fn select(&self, _stream: &dyn VideoStream) -> Result<Box<dyn Detector>, ScanError> {
            Ok(Box::new(NoDetector))
        }
    }

    struct NoDetector;

    impl Detector for NoDetector {
        fn name(&self) -> &'static str {
            "none"
        }

        fn poll(&mut self, _stream: &dyn VideoStream) -> Vec<DetectionBatch> {
            Vec::new()
        }

        fn stop(&mut self) {}
    }

    pub struct NoRecognizer;

    impl Recognizer for NoRecognizer {
        fn recognize(&self, _image: RasterImage, _language: &str, reply: Reply<RecognitionResult>) {
            reply.send(Err("Text recognition is only available in the web build".into()));
        }
    }
}
