//! Fuzzy match highlighting for suggestion renderers.
//!
//! Splits a suggestion label into matched / unmatched runs against the query
//! as a character subsequence. Pure functions, no engine state — UI adapters
//! call this per visible row.

use serde::Serialize;

/// A run of characters that either matched the query or did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSegment {
    pub text: String,
    pub matched: bool,
}

impl HighlightSegment {
    fn new(text: impl Into<String>, matched: bool) -> Self {
        Self { text: text.into(), matched }
    }
}

fn merge_runs(segments: Vec<HighlightSegment>) -> Vec<HighlightSegment> {
    let mut merged: Vec<HighlightSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.matched == segment.matched => last.text.push_str(&segment.text),
            _ => merged.push(segment),
        }
    }
    merged
}

/// Split `text` into matched and unmatched segments by scanning for `query`
/// as a case-insensitive character subsequence.
///
/// If the query is not fully contained as a subsequence, the whole text is
/// returned as a single unmatched segment — partial highlights would be
/// misleading.
pub fn highlight_segments(text: &str, query: &str) -> Vec<HighlightSegment> {
    if text.is_empty() || query.is_empty() {
        return vec![HighlightSegment::new(text, false)];
    }

    let text_chars: Vec<char> = text.chars().collect();
    let folded_text: Vec<char> = text_chars.iter().flat_map(|c| c.to_lowercase()).collect();
    let folded_query: Vec<char> = query.chars().flat_map(|c| c.to_lowercase()).collect();

    // Case folding can change lengths for exotic scripts; bail out to a
    // plain segment rather than guess at alignment.
    if folded_text.len() != text_chars.len() {
        return vec![HighlightSegment::new(text, false)];
    }

    let mut segments = Vec::new();
    let mut query_cursor = 0;
    let mut unmatched_from = 0;

    for (i, &c) in text_chars.iter().enumerate() {
        let is_match = query_cursor < folded_query.len() && folded_text[i] == folded_query[query_cursor];
        if !is_match {
            continue;
        }

        if i > unmatched_from {
            let run: String = text_chars[unmatched_from..i].iter().collect();
            segments.push(HighlightSegment::new(run, false));
        }
        segments.push(HighlightSegment::new(c, true));

        query_cursor += 1;
        unmatched_from = i + 1;
    }

    if unmatched_from < text_chars.len() {
        let run: String = text_chars[unmatched_from..].iter().collect();
        segments.push(HighlightSegment::new(run, false));
    }

    if query_cursor != folded_query.len() {
        return vec![HighlightSegment::new(text, false)];
    }

    merge_runs(segments)
}
