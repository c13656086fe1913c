pub mod calendar;
pub mod calendar_builder;
pub mod clash;
pub mod codes;
pub mod config;
pub mod derive;
pub mod duration;
pub mod error;
pub mod model;
pub mod outline;
pub mod reader;
pub mod rollup;
pub mod structured_text;
pub mod value;
pub mod xer;

use wasm_bindgen::prelude::*;

use config::ReadOptions;
use outline::OutlineRenderer;
use reader::read_str;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Read XER text and render the rolled-up outline
#[wasm_bindgen(js_name = "xerToOutline")]
pub fn xer_to_outline(source: &str, options: Option<String>) -> Result<String, String> {
    let options = match options.as_deref() {
        Some(toml) => ReadOptions::from_toml_str(toml).map_err(|e| e.to_string())?,
        None => ReadOptions::default(),
    };
    let schedule = read_str(source, &options).map_err(|e| e.to_string())?;
    Ok(OutlineRenderer::default().render(&schedule))
}
