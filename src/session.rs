/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Camera stream ownership for one dialog.
//!
//! `CaptureSession` is the only place a stream is created or released. The
//! request is asynchronous (permission prompt, hardware init), so `start()`
//! only issues it and `poll()` picks up the answer on a later frame.

use std::any::Any;

use crate::config::Facing;
use crate::error::ScanError;
use crate::inbox::{Inbox, Reply};
use crate::model::Frame;

pub type StreamResult = Result<Box<dyn VideoStream>, ScanError>;

/// Live camera stream handed out by the host
pub trait VideoStream {
    /// Most recent frame, `None` until the video has data
    fn latest_frame(&self) -> Option<Frame>;

    /// Frame for on-screen display, at most `max_width` pixels wide.
    /// Hosts that cannot scale return the full frame.
    fn preview_frame(&self, _max_width: u32) -> Option<Frame> {
        self.latest_frame()
    }

    /// Stop every track of the stream. Called at most once per stream.
    fn stop(&mut self);

    /// Lets platform detectors reach their own stream type
    fn as_any(&self) -> &dyn Any;
}

/// Camera access capability of the host
pub trait Camera {
    /// Ask for a stream; the answer is sent through `reply`, possibly much later
    fn request_stream(&self, facing: Facing, reply: Reply<StreamResult>);
}

pub struct CaptureSession {
    camera: Box<dyn Camera>,
    facing: Facing,
    stream: Option<Box<dyn VideoStream>>,
    replies: Inbox<StreamResult>,
    /// Bumped by every start/stop so late answers can be recognised
    generation: u64,
    requesting: bool,
    /// Requests issued whose reply has not been drained yet
    outstanding: usize,
}

impl CaptureSession {
    pub fn new(camera: Box<dyn Camera>, facing: Facing) -> Self {
        Self {
            camera,
            facing,
            stream: None,
            replies: Inbox::new(),
            generation: 0,
            requesting: false,
            outstanding: 0,
        }
    }

    /// Request a new stream, releasing any previous one first
    pub fn start(&mut self) {
        self.stop();
        self.requesting = true;
        self.outstanding += 1;
        log::info!("Requesting {} camera", self.facing.as_str());
        self.camera
            .request_stream(self.facing, self.replies.reply(self.generation));
    }

    /// Release the stream and forget any pending request. Safe to call any time.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.requesting = false;
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("Camera stream released");
        }
    }

    /// Pick up the answer to `start()`.
    /// Returns `Some` once per request: `Ok` when the stream is bound.
    pub fn poll(&mut self) -> Option<Result<(), ScanError>> {
        let mut outcome = None;
        for reply in self.replies.drain() {
            self.outstanding = self.outstanding.saturating_sub(1);
            if reply.generation != self.generation || !self.requesting {
                // Granted after the dialog went away: release it right away
                if let Ok(mut stream) = reply.value {
                    log::debug!("Releasing camera stream granted to a closed session");
                    stream.stop();
                }
                continue;
            }
            self.requesting = false;
            outcome = Some(match reply.value {
                Ok(stream) => {
                    log::info!("Camera stream started");
                    self.stream = Some(stream);
                    Ok(())
                }
                Err(e) => {
                    log::warn!("Camera start failed: {}", e);
                    Err(e)
                }
            });
        }
        outcome
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_requesting(&self) -> bool {
        self.requesting
    }

    /// No camera request is still in flight, stale ones included
    pub fn is_settled(&self) -> bool {
        self.outstanding == 0
    }

    pub fn stream(&self) -> Option<&dyn VideoStream> {
        self.stream.as_deref()
    }

    pub fn latest_frame(&self) -> Option<Frame> {
        self.stream.as_ref().and_then(|stream| stream.latest_frame())
    }

    pub fn preview_frame(&self, max_width: u32) -> Option<Frame> {
        self.stream
            .as_ref()
            .and_then(|stream| stream.preview_frame(max_width))
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
