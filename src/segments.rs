//! Comma-segment text editing.
//!
//! The query is a sequence of comma-delimited segments, one per address
//! component. Selections replace or extend the last segment; the helpers
//! here keep that string surgery out of the engine.

/// Last comma-delimited fragment, trimmed. The whole string if no comma.
pub(crate) fn last_fragment(text: &str) -> &str {
    text.rsplit(',').next().unwrap_or(text).trim()
}

/// Everything up to and including the last comma, with trailing whitespace
/// removed. `None` if the text has no comma yet.
pub(crate) fn prefix_before_last_comma(text: &str) -> Option<&str> {
    let idx = text.rfind(',')?;
    Some(text[..=idx].trim_end())
}

/// Replace the last comma-delimited segment with `segment`. Without a comma
/// the whole text is replaced.
pub(crate) fn replace_last_segment(text: &str, segment: &str) -> String {
    match text.rfind(',') {
        Some(idx) => format!("{} {}", &text[..=idx], segment).trim().to_string(),
        None => segment.to_string(),
    }
}

/// 1–3 ASCII digits and nothing else — the shape of a bare house number.
pub(crate) fn is_short_number(text: &str) -> bool {
    !text.is_empty() && text.len() <= 3 && text.bytes().all(|b| b.is_ascii_digit())
}

/// Whether any comma segment of `text` is a bare house number.
pub(crate) fn has_numeric_segment(text: &str) -> bool {
    text.split(',').any(|s| is_short_number(s.trim()))
}
