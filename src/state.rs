//! The engine's session state.
//!
//! One record owned by the engine, replaced wholesale on every transition
//! and handed to the observer as a snapshot. Consumers read it to render;
//! they never patch it back.

use crate::types::{AddressValue, Stage, Suggestion};

/// Everything a UI adapter needs to render the widget.
///
/// Invariants upheld by the engine:
/// - `cities`/`streets` (mixed stage) and `suggestions` are never
///   simultaneously non-empty.
/// - `is_valid` implies `stage == Some(Stage::Final)`.
/// - `selected_index` stays within `[-1, total_items - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Current text of the input field.
    pub query: String,
    /// Current disambiguation phase, `None` before the first response.
    pub stage: Option<Stage>,
    /// City candidates (mixed stage only).
    pub cities: Vec<Suggestion>,
    /// Street candidates (mixed stage only).
    pub streets: Vec<Suggestion>,
    /// Flat candidate list for every other stage.
    pub suggestions: Vec<Suggestion>,
    /// The resolved structured address, set when a selection completes.
    pub value: Option<AddressValue>,
    /// A complete address has been resolved.
    pub is_valid: bool,
    /// The last network attempt failed terminally.
    pub is_error: bool,
    /// A fetch is in flight (including retries).
    pub is_loading: bool,
    /// The last page was full — more results may exist server-side.
    pub has_more: bool,
    /// Keyboard-highlighted index into `cities ++ streets ++ suggestions`;
    /// `-1` means nothing is highlighted.
    pub selected_index: isize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            query: String::new(),
            stage: None,
            cities: Vec::new(),
            streets: Vec::new(),
            suggestions: Vec::new(),
            value: None,
            is_valid: false,
            is_error: false,
            is_loading: false,
            has_more: false,
            selected_index: -1,
        }
    }
}

impl SessionState {
    /// Combined length of all candidate lists.
    pub fn total_items(&self) -> usize {
        self.cities.len() + self.streets.len() + self.suggestions.len()
    }

    /// Item at `index` within the concatenation `cities ++ streets ++ suggestions`.
    pub fn item_at(&self, index: usize) -> Option<&Suggestion> {
        self.cities
            .iter()
            .chain(self.streets.iter())
            .chain(self.suggestions.iter())
            .nth(index)
    }

    pub(crate) fn clear_lists(&mut self) {
        self.cities.clear();
        self.streets.clear();
        self.suggestions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        let st = SessionState::default();
        assert_eq!(st.selected_index, -1);
        assert!(!st.is_loading && !st.is_valid && !st.is_error && !st.has_more);
        assert_eq!(st.total_items(), 0);
        assert!(st.item_at(0).is_none());
    }

    #[test]
    fn item_at_spans_all_lists() {
        let st = SessionState {
            cities: vec![Suggestion::from_label("Eindhoven")],
            streets: vec![Suggestion::from_label("Klokgebouw")],
            suggestions: vec![Suggestion::from_label("5612")],
            ..SessionState::default()
        };
        assert_eq!(st.total_items(), 3);
        assert_eq!(st.item_at(0).unwrap().label, "Eindhoven");
        assert_eq!(st.item_at(1).unwrap().label, "Klokgebouw");
        assert_eq!(st.item_at(2).unwrap().label, "5612");
        assert!(st.item_at(3).is_none());
    }
}
