/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Barcode detection strategy behind one interface.
//!
//! The host offers either a one-shot detector (asked once per frame) or a
//! continuous decoder that reports through callbacks. A `DetectorBackend`
//! picks one when the stream starts; the scan loop only sees `Detector`.

use crate::error::ScanError;
use crate::session::VideoStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    pub raw_value: String,
    pub format: Option<String>,
}

/// Result of one detection attempt. Errors are per-frame and never fatal.
pub type DetectionBatch = Result<Vec<Detection>, String>;

pub trait Detector {
    fn name(&self) -> &'static str;

    /// Called once per frame while scanning. Returns the attempts completed
    /// since the previous call and may start the next one; implementations
    /// keep at most one attempt outstanding.
    fn poll(&mut self, stream: &dyn VideoStream) -> Vec<DetectionBatch>;

    /// Stop producing results. Idempotent.
    fn stop(&mut self);
}

pub trait DetectorBackend {
    /// Choose the strategy for a freshly started stream. Fails when no
    /// strategy can read this stream at all.
    fn select(&self, stream: &dyn VideoStream) -> Result<Box<dyn Detector>, ScanError>;
}
