/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Error taxonomy shared by both scan dialogs.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanError {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    /// The text recognizer itself failed (not "no date in the text")
    RecognitionFailure(String),
    NoMatchFound,
    Unknown(String),
}

impl ScanError {
    /// Classify a camera failure from the DOM exception name reported by
    /// `getUserMedia` (e.g. `NotAllowedError`).
    pub fn from_camera_failure(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                ScanError::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                ScanError::DeviceNotFound
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => ScanError::DeviceBusy,
            _ if message.is_empty() => ScanError::Unknown(name.to_string()),
            _ => ScanError::Unknown(message.to_string()),
        }
    }

    /// Text shown to the user inside the dialog
    pub fn user_message(&self) -> String {
        match self {
            ScanError::PermissionDenied => {
                "Camera access was denied. Allow camera access in your browser settings and try again."
                    .into()
            }
            ScanError::DeviceNotFound => {
                "No camera was found. Connect one and try again.".into()
            }
            ScanError::DeviceBusy => {
                "The camera is already in use by another application.".into()
            }
            ScanError::RecognitionFailure(_) => {
                "Text recognition failed. Please try again.".into()
            }
            ScanError::NoMatchFound => {
                "No expiry date found. Please try again or enter the date manually.".into()
            }
            ScanError::Unknown(_) => "The camera could not be started.".into(),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => write!(f, "camera permission denied"),
            ScanError::DeviceNotFound => write!(f, "camera device not found"),
            ScanError::DeviceBusy => write!(f, "camera device busy"),
            ScanError::RecognitionFailure(reason) => write!(f, "recognition failed: {}", reason),
            ScanError::NoMatchFound => write!(f, "no matching date found"),
            ScanError::Unknown(reason) => write!(f, "unknown camera error: {}", reason),
        }
    }
}

impl std::error::Error for ScanError {}
