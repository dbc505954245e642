//! Tracks the server-issued view state token.
//!
//! Every rendered page carries a hidden `javax.faces.ViewState` input. The
//! value changes on every round trip and the next postback must echo the
//! latest one, otherwise the server ignores the request.

use std::fmt;

use scraper::Html;

use crate::html::id_selector;
use crate::types::{ScrapeError, ScrapeResult};

/// Element id of the hidden view state input.
pub const VIEW_STATE_ID: &str = "j_id1:javax.faces.ViewState:0";

/// Opaque state token issued by the server for one render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewState(String);

impl ViewState {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the view state token from a rendered page.
///
/// A missing field means the page structure changed and no later request
/// can be trusted, so this is a [`ScrapeError::ProtocolFormat`].
pub fn extract_view_state(html: &str) -> ScrapeResult<ViewState> {
    let document = Html::parse_document(html);
    let sel = id_selector("input", VIEW_STATE_ID)?;

    let input = document
        .select(&sel)
        .next()
        .ok_or_else(|| ScrapeError::ProtocolFormat(format!("no element with id {VIEW_STATE_ID}")))?;

    match input.value().attr("value") {
        Some(value) if !value.is_empty() => Ok(ViewState::new(value)),
        Some(_) => Err(ScrapeError::ProtocolFormat("view state value is empty".into())),
        None => Err(ScrapeError::ProtocolFormat(
            "view state input has no value attribute".into(),
        )),
    }
}
