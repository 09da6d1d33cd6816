/*
 * SPDX-FileCopyrightText: © 2025 Jinwoo Park (pmnxis@gmail.com)
 *
 * SPDX-License-Identifier: MIT
 */

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod barcode;
mod config;
mod detector;
mod dialog;
mod error;
mod expiry;
mod inbox;
mod model;
mod parser;
mod platform;
mod session;

#[cfg(target_arch = "wasm32")]
mod ocr;
#[cfg(target_arch = "wasm32")]
mod web_camera;

#[cfg(test)]
mod testing;

use app::ShelfScanApp;

// Desktop entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Shelf Scan",
        native_options,
        Box::new(|cc| Ok(Box::new(ShelfScanApp::new(cc)))),
    )
}

// WASM entry point
#[cfg(target_arch = "wasm32")]
fn main() {
    use wasm_bindgen::JsCast;

    console_error_panic_hook::set_once();
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    // Camera, barcode and OCR access go through /js/scan_bridge.js, which
    // trunk serves next to the wasm bundle; nothing needs preloading here.

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("the_canvas_id")
            .expect("Failed to find the_canvas_id")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("the_canvas_id is not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(ShelfScanApp::new(cc)))),
            )
            .await;

        // Remove loading text
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            if let Some(parent) = loading_text.parent_node() {
                parent.remove_child(&loading_text).ok();
            }
        }

        if let Err(e) = start_result {
            log::error!("Failed to start eframe: {:?}", e);
            panic!("Failed to start eframe: {:?}", e);
        }
    });
}
