//! Small helpers shared by the HTML readers.

use scraper::{ElementRef, Selector};

use crate::types::{ScrapeError, ScrapeResult};

/// Parse a CSS selector, reporting failures as invalid input.
pub(crate) fn selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidInput(format!("bad selector `{css}`: {e}")))
}

/// Selector matching an element by its exact `id`.
///
/// Dashboard ids contain `:` so the `#id` shorthand is not usable.
pub(crate) fn id_selector(tag: &str, id: &str) -> ScrapeResult<Selector> {
    selector(&format!(r#"{tag}[id="{id}"]"#))
}

/// Text content of an element with whitespace collapsed.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// Collapse runs of whitespace into a single space and trim.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
