//! Mapping between looked-up characters and URL paths.
//!
//! Character pages live under `/char/<ch>`, with `<ch>` encoded the way a
//! browser's `encodeURIComponent` would encode it, so links produced here
//! round-trip through the client-side router unchanged.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;

pub const CHAR_PREFIX: &str = "/char/";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub fn char_path(ch: &str) -> String {
    format!("{CHAR_PREFIX}{}", encode_component(ch))
}

/// Path for a character page rendered in the given view.
pub fn char_href(ch: &str, view: ViewMode) -> String {
    match view {
        ViewMode::List => char_path(ch),
        ViewMode::Table => format!("{}?view={}", char_path(ch), view.query_value()),
    }
}

/// Extracts the character from a `/char/<ch>` path.
///
/// Returns `None` for other paths, an empty capture, a malformed `%` escape, or
/// a capture that does not decode to UTF-8.
pub fn char_from_path(path: &str) -> Option<String> {
    let raw = path.strip_prefix(CHAR_PREFIX)?;
    if raw.is_empty() || !has_valid_escapes(raw) {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Every `%` must start a two-digit hex escape, as `decodeURIComponent` requires.
fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        match bytes.get(i + 1..i + 3) {
            Some(pair) if pair.iter().all(u8::is_ascii_hexdigit) => i += 3,
            _ => return false,
        }
    }
    true
}

/// Trims user input; blank input means there is nothing to look up.
pub fn normalize_input(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Table,
}

impl ViewMode {
    /// Parses the `view` query parameter. Anything but `table` selects the list view.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("table") => ViewMode::Table,
            _ => ViewMode::List,
        }
    }

    pub fn query_value(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Table => "table",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::List => ViewMode::Table,
            ViewMode::Table => ViewMode::List,
        }
    }

    pub fn is_table(self) -> bool {
        matches!(self, ViewMode::Table)
    }

    /// Label for the link that switches to the other view.
    pub fn toggle_label(self) -> &'static str {
        match self {
            ViewMode::List => "Show region table",
            ViewMode::Table => "Show list",
        }
    }
}
