/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

/// One RGBA video frame, tightly packed (no stride padding)
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

/// Still frame encoded for the text recognizer, at the frame's native size
#[derive(Clone, Debug)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RasterImage {
    pub fn from_frame(frame: &Frame) -> Result<Self, String> {
        let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba.to_vec())
            .ok_or_else(|| "Frame data does not match its dimensions".to_string())?;
        let mut png = Vec::new();
        buffer
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| format!("PNG encoding error: {}", e))?;
        Ok(Self {
            width: frame.width,
            height: frame.height,
            png,
        })
    }
}

/// A single barcode read, consumed immediately
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionResult {
    pub raw_value: String,
    pub format: Option<String>,
    pub timestamp: Duration,
}

/// Remembers when a barcode was last accepted.
/// Times are offsets from the host clock origin (egui's `input.time`).
#[derive(Clone, Copy, Debug, Default)]
pub struct DebounceState {
    last_accepted_at: Option<Duration>,
}

impl DebounceState {
    /// Accept and record `now` unless the last acceptance is within `window`.
    /// Check and update happen together so two reads in one frame cannot both pass.
    pub fn try_accept(&mut self, now: Duration, window: Duration) -> bool {
        if let Some(last) = self.last_accepted_at
            && now.saturating_sub(last) <= window
        {
            return false;
        }
        self.last_accepted_at = Some(now);
        true
    }
}

/// Field order of the text a date was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateOrder {
    /// dd/mm/yyyy
    Dmy,
    /// yyyy-mm-dd
    Ymd,
}

impl std::fmt::Display for DateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateOrder::Dmy => write!(f, "DD/MM/YYYY"),
            DateOrder::Ymd => write!(f, "YYYY-MM-DD"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateDate {
    pub date: NaiveDate,
    pub source_format: DateOrder,
}

impl CandidateDate {
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionOutcome {
    NoneFound,
    SingleFound(CandidateDate),
    /// Every valid candidate, in scan order
    MultipleFound(Vec<CandidateDate>),
}

impl ExtractionOutcome {
    pub fn from_candidates(mut candidates: Vec<CandidateDate>) -> Self {
        match candidates.len() {
            0 => ExtractionOutcome::NoneFound,
            1 => ExtractionOutcome::SingleFound(candidates.remove(0)),
            _ => ExtractionOutcome::MultipleFound(candidates),
        }
    }

    /// The date handed to the caller. With several candidates the first one in
    /// scan order wins and the rest are dropped without asking the user.
    pub fn selected(&self) -> Option<&CandidateDate> {
        match self {
            ExtractionOutcome::NoneFound => None,
            ExtractionOutcome::SingleFound(candidate) => Some(candidate),
            ExtractionOutcome::MultipleFound(candidates) => candidates.first(),
        }
    }
}

/// Product entry form filled by the scan dialogs or by hand
pub struct ProductForm {
    pub name: String,
    pub barcode: String,
    /// ISO `YYYY-MM-DD`
    pub expiry_date: String,
    pub status_message: String,
}

impl ProductForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            barcode: String::new(),
            expiry_date: String::new(),
            status_message: "Scan a barcode or an expiry date".into(),
        }
    }

    pub fn expiry_date_is_valid(&self) -> bool {
        NaiveDate::parse_from_str(self.expiry_date.trim(), "%Y-%m-%d").is_ok()
    }
}
