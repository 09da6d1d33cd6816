/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! In-process stand-ins for the host capabilities, shared by unit tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::Facing;
use crate::detector::{Detection, DetectionBatch, Detector, DetectorBackend};
use crate::error::ScanError;
use crate::expiry::{RecognitionResult, Recognizer};
use crate::inbox::Reply;
use crate::model::{Frame, RasterImage};
use crate::session::{Camera, StreamResult, VideoStream};

pub fn test_frame() -> Frame {
    Frame {
        width: 4,
        height: 2,
        rgba: Arc::from(vec![200u8; 4 * 2 * 4]),
    }
}

#[derive(Default)]
struct StreamCounters {
    open: Cell<usize>,
    stops: Cell<usize>,
    grabs: Cell<usize>,
    frame: RefCell<Option<Frame>>,
}

struct FakeStream {
    counters: Rc<StreamCounters>,
    stopped: bool,
}

impl FakeStream {
    fn new(counters: Rc<StreamCounters>) -> Self {
        counters.open.set(counters.open.get() + 1);
        Self {
            counters,
            stopped: false,
        }
    }
}

impl VideoStream for FakeStream {
    fn latest_frame(&self) -> Option<Frame> {
        self.counters.grabs.set(self.counters.grabs.get() + 1);
        self.counters.frame.borrow().clone()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.open.set(self.counters.open.get() - 1);
            self.counters.stops.set(self.counters.stops.get() + 1);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum CameraMode {
    Grant,
    Fail(ScanError),
    Defer,
}

struct CameraState {
    mode: CameraMode,
    pending: Vec<Reply<StreamResult>>,
    facings: Vec<Facing>,
}

#[derive(Clone)]
pub struct FakeCamera {
    state: Rc<RefCell<CameraState>>,
    counters: Rc<StreamCounters>,
}

impl FakeCamera {
    fn with_mode(mode: CameraMode) -> Self {
        let counters = StreamCounters::default();
        *counters.frame.borrow_mut() = Some(test_frame());
        Self {
            state: Rc::new(RefCell::new(CameraState {
                mode,
                pending: Vec::new(),
                facings: Vec::new(),
            })),
            counters: Rc::new(counters),
        }
    }

    /// Grants every request immediately
    pub fn granting() -> Self {
        Self::with_mode(CameraMode::Grant)
    }

    pub fn failing(error: ScanError) -> Self {
        Self::with_mode(CameraMode::Fail(error))
    }

    /// Holds requests until `grant_pending()` is called
    pub fn deferred() -> Self {
        Self::with_mode(CameraMode::Defer)
    }

    /// A camera showed up: later requests are granted
    pub fn plug_in(&self) {
        self.state.borrow_mut().mode = CameraMode::Grant;
    }

    pub fn grant_pending(&self) {
        let pending: Vec<_> = self.state.borrow_mut().pending.drain(..).collect();
        for reply in pending {
            reply.send(Ok(self.new_stream()));
        }
    }

    fn new_stream(&self) -> Box<dyn VideoStream> {
        Box::new(FakeStream::new(Rc::clone(&self.counters)))
    }

    pub fn set_frame(&self, frame: Option<Frame>) {
        *self.counters.frame.borrow_mut() = frame;
    }

    pub fn open_streams(&self) -> usize {
        self.counters.open.get()
    }

    pub fn stop_calls(&self) -> usize {
        self.counters.stops.get()
    }

    /// Frames read from any stream of this camera
    pub fn frame_grabs(&self) -> usize {
        self.counters.grabs.get()
    }

    pub fn requested_facings(&self) -> Vec<Facing> {
        self.state.borrow().facings.clone()
    }
}

impl Camera for FakeCamera {
    fn request_stream(&self, facing: Facing, reply: Reply<StreamResult>) {
        let mut state = self.state.borrow_mut();
        state.facings.push(facing);
        if matches!(state.mode, CameraMode::Defer) {
            state.pending.push(reply);
            return;
        }
        let result = match &state.mode {
            CameraMode::Fail(error) => Err(error.clone()),
            _ => Ok(self.new_stream()),
        };
        drop(state);
        reply.send(result);
    }
}

#[derive(Default)]
struct DetectorState {
    /// One entry per frame; frames past the end of the script see nothing
    script: VecDeque<Vec<DetectionBatch>>,
    polls: usize,
    selected: usize,
    stopped: bool,
    rejection: Option<ScanError>,
}

/// Backend whose detectors replay a per-frame script
#[derive(Clone, Default)]
pub struct ScriptedDetectors {
    state: Rc<RefCell<DetectorState>>,
}

impl ScriptedDetectors {
    pub fn push_frame(&self, batches: Vec<DetectionBatch>) {
        self.state.borrow_mut().script.push_back(batches);
    }

    pub fn push_detection(&self, raw_value: &str) {
        self.push_frame(vec![Ok(vec![detection(raw_value)])]);
    }

    /// Every later stream is refused with `error`
    pub fn reject_streams(&self, error: ScanError) {
        self.state.borrow_mut().rejection = Some(error);
    }

    pub fn push_empty(&self) {
        self.push_frame(vec![Ok(Vec::new())]);
    }

    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }

    pub fn selected(&self) -> usize {
        self.state.borrow().selected
    }

    pub fn stopped(&self) -> bool {
        self.state.borrow().stopped
    }
}

pub fn detection(raw_value: &str) -> Detection {
    Detection {
        raw_value: raw_value.to_string(),
        format: Some("ean_13".into()),
    }
}

struct ScriptedDetector {
    state: Rc<RefCell<DetectorState>>,
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn poll(&mut self, _stream: &dyn VideoStream) -> Vec<DetectionBatch> {
        let mut state = self.state.borrow_mut();
        if state.stopped {
            return Vec::new();
        }
        state.polls += 1;
        state.script.pop_front().unwrap_or_default()
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stopped = true;
    }
}

impl DetectorBackend for ScriptedDetectors {
    fn select(&self, _stream: &dyn VideoStream) -> Result<Box<dyn Detector>, ScanError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = &state.rejection {
            return Err(error.clone());
        }
        state.selected += 1;
        state.stopped = false;
        Ok(Box::new(ScriptedDetector {
            state: Rc::clone(&self.state),
        }))
    }
}

#[derive(Default)]
struct RecognizerState {
    pending: VecDeque<Reply<RecognitionResult>>,
    languages: Vec<String>,
    images: Vec<RasterImage>,
}

/// Recognizer that answers only when the test says so
#[derive(Clone, Default)]
pub struct FakeRecognizer {
    state: Rc<RefCell<RecognizerState>>,
}

impl FakeRecognizer {
    pub fn submissions(&self) -> usize {
        self.state.borrow().images.len()
    }

    pub fn languages(&self) -> Vec<String> {
        self.state.borrow().languages.clone()
    }

    pub fn last_image_size(&self) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .images
            .last()
            .map(|image| (image.width, image.height))
    }

    /// Answer the oldest outstanding request
    pub fn resolve_next(&self, result: RecognitionResult) {
        let reply = self.state.borrow_mut().pending.pop_front();
        if let Some(reply) = reply {
            reply.send(result);
        }
    }
}

impl Recognizer for FakeRecognizer {
    fn recognize(&self, image: RasterImage, language: &str, reply: Reply<RecognitionResult>) {
        let mut state = self.state.borrow_mut();
        state.images.push(image);
        state.languages.push(language.to_string());
        state.pending.push_back(reply);
    }
}
