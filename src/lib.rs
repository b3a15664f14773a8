/// Tab Pilot - Chrome side panel that searches and groups tabs with a language model
/// Built with Rust + WASM + Yew

pub mod batch;
pub mod browser;
pub mod categorizer;
pub mod classify;
pub mod executor;
pub mod matcher;
pub mod snapshot;
pub mod storage;
pub mod tab_data;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the side panel
#[wasm_bindgen]
pub fn start_side_panel() {
    yew::Renderer::<ui::side_panel::SidePanel>::new().render();
}
