//! Browser host for the token hover overlay.
//!
//! Reads the highlighted file from `#blob`, renders its line table into
//! `#blob-table` and runs the document view on the page's event loop.
//! Lookups go through two functions the page defines, `fetchHoverInfo(url)`
//! and `fetchJumpTarget(url)`, each returning a promise of a string or
//! `null`.

mod dom;
mod host;
mod viewer;

use blobview::{LineTable, markup};
use wasm_bindgen::prelude::*;

/// Initialize the panic hook and attach the viewer to the page.
///
/// # Errors
///
/// Returns a `JsValue` error if the page has no `#blob` element or the URL
/// does not address a file.
#[wasm_bindgen(start)]
pub fn init() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    viewer::setup()
}

/// Render highlighted markup as a line table, for pages that build the
/// viewer's HTML ahead of time.
///
/// # Errors
///
/// Returns the parse error message when the markup is not balanced.
#[wasm_bindgen(js_name = renderTable)]
pub fn render_table(highlighted: &str, highlight_class: &str) -> Result<String, JsValue> {
    let nodes = markup::parse(highlighted).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(LineTable::build(&nodes).render(highlight_class).to_html())
}
