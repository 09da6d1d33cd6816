/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Scanner tunables. Defaults match the behaviour of the shipped dialogs.
//!
//! A host may override any subset of the fields with a JSON object, e.g.
//! `{"facing": "user", "ocr_timeout_ms": null}`; missing fields keep their
//! default.

use std::time::Duration;

use serde::Deserialize;

/// Which camera to ask the host for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Environment,
    User,
}

impl Facing {
    /// `facingMode` constraint value understood by `getUserMedia`
    pub fn as_str(self) -> &'static str {
        match self {
            Facing::Environment => "environment",
            Facing::User => "user",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub facing: Facing,
    /// Detections closer than this to the last accepted one are ignored
    pub debounce_window_ms: u64,
    /// Pause between a successful detection and its delivery
    pub success_delay_ms: u64,
    /// Accepted expiry years are strictly between these two
    pub min_year_exclusive: i32,
    pub max_year_exclusive: i32,
    pub ocr_language: String,
    /// `None` waits for the recognizer forever
    pub ocr_timeout_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            debounce_window_ms: 2000,
            success_delay_ms: 800,
            min_year_exclusive: 2020,
            max_year_exclusive: 2050,
            ocr_language: "eng".into(),
            ocr_timeout_ms: Some(30_000),
        }
    }
}

impl ScanConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parse an optional override, falling back to the defaults when it is
    /// absent or malformed
    pub fn from_override(source: Option<&str>) -> Self {
        let Some(text) = source.map(str::trim).filter(|text| !text.is_empty()) else {
            return Self::default();
        };
        match Self::from_json(text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring invalid scanner configuration: {}", e);
                Self::default()
            }
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }

    pub fn ocr_timeout(&self) -> Option<Duration> {
        self.ocr_timeout_ms.map(Duration::from_millis)
    }

    pub fn year_in_range(&self, year: i32) -> bool {
        self.min_year_exclusive < year && year < self.max_year_exclusive
    }
}
