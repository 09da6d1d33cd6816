/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Browser camera and barcode detection via wasm-bindgen.
//! getUserMedia for the stream, then either the native `BarcodeDetector`
//! (one call per frame) or ZXing's continuous decoder as fallback.

use std::any::Any;
use std::sync::Arc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::config::Facing;
use crate::detector::{Detection, DetectionBatch, Detector, DetectorBackend};
use crate::error::ScanError;
use crate::inbox::{Inbox, Reply};
use crate::model::Frame;
use crate::session::{Camera, StreamResult, VideoStream};

#[wasm_bindgen(module = "/js/scan_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn open_camera(facing: &str) -> Result<JsValue, JsValue>;

    fn close_camera(handle: &JsValue);

    fn grab_frame(handle: &JsValue, max_width: u32) -> JsValue;

    fn has_native_detector() -> bool;

    #[wasm_bindgen(catch)]
    async fn detect_once(handle: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    fn start_continuous_decode(
        handle: &JsValue,
        on_result: &js_sys::Function,
        on_error: &js_sys::Function,
    ) -> Result<JsValue, JsValue>;

    fn stop_continuous_decode(control: &JsValue);
}

fn js_field(value: &JsValue, key: &str) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str(key))
        .ok()?
        .as_string()
}

fn describe(value: &JsValue) -> String {
    js_field(value, "message")
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

pub struct WebCamera;

impl Camera for WebCamera {
    fn request_stream(&self, facing: Facing, reply: Reply<StreamResult>) {
        spawn_local(async move {
            let result: StreamResult = match open_camera(facing.as_str()).await {
                Ok(handle) => Ok(Box::new(WebStream {
                    handle,
                    stopped: false,
                })),
                Err(e) => {
                    let name = js_field(&e, "name").unwrap_or_default();
                    let message = js_field(&e, "message").unwrap_or_default();
                    log::warn!("getUserMedia failed: {} {}", name, message);
                    Err(ScanError::from_camera_failure(&name, &message))
                }
            };
            reply.send(result);
        });
    }
}

/// JS handle holding the MediaStream and its hidden <video> element
pub struct WebStream {
    handle: JsValue,
    stopped: bool,
}

impl VideoStream for WebStream {
    fn latest_frame(&self) -> Option<Frame> {
        self.grab(0)
    }

    fn preview_frame(&self, max_width: u32) -> Option<Frame> {
        self.grab(max_width)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            close_camera(&self.handle);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl WebStream {
    /// `max_width == 0` keeps the native resolution
    fn grab(&self, max_width: u32) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        let frame = grab_frame(&self.handle, max_width);
        if frame.is_null() || frame.is_undefined() {
            return None;
        }
        let width = js_sys::Reflect::get(&frame, &"width".into()).ok()?.as_f64()? as u32;
        let height = js_sys::Reflect::get(&frame, &"height".into()).ok()?.as_f64()? as u32;
        let data: js_sys::Uint8ClampedArray = js_sys::Reflect::get(&frame, &"data".into())
            .ok()?
            .dyn_into()
            .ok()?;
        Some(Frame {
            width,
            height,
            rgba: Arc::from(data.to_vec()),
        })
    }
}

impl Drop for WebStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Picks the native detector when the browser has one
pub struct WebDetectors;

impl DetectorBackend for WebDetectors {
    fn select(&self, stream: &dyn VideoStream) -> Result<Box<dyn Detector>, ScanError> {
        let handle = stream
            .as_any()
            .downcast_ref::<WebStream>()
            .map(|stream| stream.handle.clone())
            .ok_or_else(|| ScanError::Unknown("stream is not a browser camera".into()))?;
        if has_native_detector() {
            Ok(Box::new(NativeDetector {
                handle,
                results: Inbox::new(),
                in_flight: false,
                stopped: false,
            }))
        } else {
            Ok(Box::new(ContinuousDecoder::start(&handle)))
        }
    }
}

fn parse_detections(value: &JsValue) -> Result<Vec<Detection>, String> {
    let array: &js_sys::Array = value
        .dyn_ref()
        .ok_or_else(|| "Expected array from barcode detector".to_string())?;
    Ok(array
        .iter()
        .filter_map(|item| {
            Some(Detection {
                raw_value: js_field(&item, "rawValue")?,
                format: js_field(&item, "format"),
            })
        })
        .collect())
}

/// `BarcodeDetector.detect()` on the video element, one call per frame
struct NativeDetector {
    handle: JsValue,
    results: Inbox<DetectionBatch>,
    in_flight: bool,
    stopped: bool,
}

impl Detector for NativeDetector {
    fn name(&self) -> &'static str {
        "BarcodeDetector"
    }

    fn poll(&mut self, _stream: &dyn VideoStream) -> Vec<DetectionBatch> {
        let batches: Vec<DetectionBatch> = self
            .results
            .drain()
            .into_iter()
            .map(|reply| reply.value)
            .collect();
        if !batches.is_empty() {
            self.in_flight = false;
        }

        if !self.in_flight && !self.stopped {
            self.in_flight = true;
            let handle = self.handle.clone();
            let reply = self.results.reply(0);
            spawn_local(async move {
                let batch = match detect_once(&handle).await {
                    Ok(found) => parse_detections(&found),
                    Err(e) => Err(describe(&e)),
                };
                reply.send(batch);
            });
        }
        batches
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// ZXing decoding the stream continuously and reporting through callbacks
struct ContinuousDecoder {
    control: Option<JsValue>,
    results: Inbox<DetectionBatch>,
    _on_result: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl ContinuousDecoder {
    fn start(handle: &JsValue) -> Self {
        let results = Inbox::new();

        let reply = results.reply(0);
        let on_result = Closure::<dyn FnMut(JsValue)>::new(move |found: JsValue| {
            let batch = match js_field(&found, "rawValue") {
                Some(raw_value) => Ok(vec![Detection {
                    raw_value,
                    format: js_field(&found, "format"),
                }]),
                None => Err("Decoder result without text".to_string()),
            };
            reply.send(batch);
        });

        let reply = results.reply(0);
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
            reply.send(Err(describe(&err)));
        });

        let control = match start_continuous_decode(
            handle,
            on_result.as_ref().unchecked_ref(),
            on_error.as_ref().unchecked_ref(),
        ) {
            Ok(control) => Some(control),
            Err(e) => {
                let reason = describe(&e);
                log::error!("Continuous barcode decoder failed to start: {}", reason);
                results.reply(0).send(Err(reason));
                None
            }
        };

        Self {
            control,
            results,
            _on_result: on_result,
            _on_error: on_error,
        }
    }
}

impl Detector for ContinuousDecoder {
    fn name(&self) -> &'static str {
        "ZXing"
    }

    fn poll(&mut self, _stream: &dyn VideoStream) -> Vec<DetectionBatch> {
        self.results
            .drain()
            .into_iter()
            .map(|reply| reply.value)
            .collect()
    }

    fn stop(&mut self) {
        if let Some(control) = self.control.take() {
            stop_continuous_decode(&control);
        }
    }
}

impl Drop for ContinuousDecoder {
    fn drop(&mut self) {
        // JS must not call the closures after they are freed
        self.stop();
    }
}
