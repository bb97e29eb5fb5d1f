/// Tab Trail - Chrome extension background that tracks which tab opened which
/// Built with Rust + WASM

pub mod chrome;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod notify;
pub mod operations;
pub mod serial;
pub mod storage;
pub mod tab_data;
pub mod tree;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

pub use engine::{Applied, HierarchyEngine};
pub use error::TrailError;
pub use tree::{project, TreeNode, TreeView};

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console at the configured level
pub fn init_logging(config: &config::TrailConfig) {
    wasm_logger::init(wasm_logger::Config::new(config.level()));
}
