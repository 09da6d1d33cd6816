/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

//! Tesseract.js interop via wasm-bindgen

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::expiry::{RecognitionResult, Recognizer};
use crate::inbox::Reply;
use crate::model::RasterImage;

#[wasm_bindgen(module = "/js/scan_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn ocr_recognize(image_bytes: &[u8], language: &str) -> Result<JsValue, JsValue>;
}

/// Perform OCR on PNG bytes, returns recognized text
pub async fn recognize_text(image_bytes: &[u8], language: &str) -> Result<String, String> {
    let result = ocr_recognize(image_bytes, language)
        .await
        .map_err(|e| format!("OCR error: {:?}", e))?;
    result
        .as_string()
        .ok_or_else(|| "OCR returned non-string result".into())
}

pub struct TesseractRecognizer;

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: RasterImage, language: &str, reply: Reply<RecognitionResult>) {
        let language = language.to_string();
        spawn_local(async move {
            let result = recognize_text(&image.png, &language).await;
            if let Ok(text) = &result {
                log::debug!("OCR returned {} characters", text.len());
            }
            reply.send(result);
        });
    }
}
