/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Find expiry dates in OCR text.
//! Two formats are recognised, each with `/`, `-` or `.` as separator:
//! - 31/12/2030 (day first)
//! - 2030-12-31 (year first)

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::config::ScanConfig;
use crate::model::{CandidateDate, DateOrder, ExtractionOutcome};

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})").expect("day-first date pattern")
});

static YMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})").expect("year-first date pattern")
});

/// Parse OCR text into an outcome using the year bounds from `config`
pub fn extract_expiry_dates(text: &str, config: &ScanConfig) -> ExtractionOutcome {
    ExtractionOutcome::from_candidates(find_candidates(text, config))
}

/// All valid candidates: every day-first match left to right, then every
/// year-first match left to right.
pub fn find_candidates(text: &str, config: &ScanConfig) -> Vec<CandidateDate> {
    let day_first = DMY_RE.captures_iter(text).filter_map(|caps| {
        candidate(&caps[3], &caps[2], &caps[1], DateOrder::Dmy, config)
    });
    let year_first = YMD_RE.captures_iter(text).filter_map(|caps| {
        candidate(&caps[1], &caps[2], &caps[3], DateOrder::Ymd, config)
    });
    day_first.chain(year_first).collect()
}

fn candidate(
    year: &str,
    month: &str,
    day: &str,
    order: DateOrder,
    config: &ScanConfig,
) -> Option<CandidateDate> {
    let iso = format!("{}-{:0>2}-{:0>2}", year, month, day);
    let date = match NaiveDate::parse_from_str(&iso, "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            log::debug!("Discarding '{}': {}", iso, e);
            return None;
        }
    };
    if !config.year_in_range(date.year()) {
        log::debug!("Discarding '{}': year out of range", iso);
        return None;
    }
    Some(CandidateDate {
        date,
        source_format: order,
    })
}
