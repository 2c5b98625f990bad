//! Display-label reordering.
//!
//! When a suggestion carries structured address data, its label is rewritten
//! to mirror the order in which the user actually typed the components, so a
//! query like "Am Hopfengarten, Ahnatal, 4" yields
//! "Am Hopfengarten, Ahnatal, 4, 34292" instead of the API's default
//! component order. Components the user did not type are appended in a
//! fixed canonical order afterwards.

use crate::types::AddressValue;

/// Address component kinds, in canonical append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Street,
    StreetNumber,
    Addition,
    Postcode,
    City,
}

const CANONICAL_ORDER: [Component; 5] = [
    Component::Street,
    Component::StreetNumber,
    Component::Addition,
    Component::Postcode,
    Component::City,
];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Position of `value` in `query` using word-boundary matching, so "4" does
/// not match inside "34292". Multi-word values (street names) use a plain
/// substring search. Positions are only compared against each other, never
/// used to slice.
fn find_word_position(query: &str, value: &str) -> Option<usize> {
    let query = normalize(query);
    let value = normalize(value);
    if value.is_empty() {
        return None;
    }

    if value.contains(' ') {
        return query.find(&value);
    }

    for (pos, matched) in query.match_indices(&value) {
        let boundary_before = query[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| c == ',' || c.is_whitespace());
        let boundary_after = query[pos + matched.len()..]
            .chars()
            .next()
            .is_none_or(|c| c == ',' || c.is_whitespace());
        if boundary_before && boundary_after {
            return Some(pos);
        }
    }
    None
}

fn component_text(value: &AddressValue, component: Component) -> Option<String> {
    match component {
        Component::Street => value.street.clone(),
        Component::City => value.city.clone(),
        Component::StreetNumber => value.street_number.as_ref().map(|n| n.to_string()),
        Component::Postcode => value.postcode.clone(),
        Component::Addition => value.addition.clone(),
    }
}

/// Rewrite a display label so the components the user already typed come
/// first, in their typed order, followed by the remaining components in
/// canonical order. Returns an empty string when the query or value carries
/// nothing to order.
pub fn format_label_by_input_order(query: &str, value: &AddressValue) -> String {
    if query.trim().is_empty() || value.is_empty() {
        return String::new();
    }

    // Detection checks street and city before number and addition so longer,
    // more specific values claim their position first.
    let detection_order = [
        Component::Street,
        Component::City,
        Component::Postcode,
        Component::StreetNumber,
        Component::Addition,
    ];

    let mut detected: Vec<(usize, Component, String)> = Vec::new();
    for component in detection_order {
        let Some(text) = component_text(value, component) else {
            continue;
        };
        if let Some(pos) = find_word_position(query, &text) {
            detected.push((pos, component, text));
        }
    }
    detected.sort_by_key(|(pos, _, _)| *pos);

    let mut parts: Vec<String> = detected.iter().map(|(_, _, text)| text.clone()).collect();
    for component in CANONICAL_ORDER {
        if detected.iter().any(|(_, c, _)| *c == component) {
            continue;
        }
        if let Some(text) = component_text(value, component) {
            parts.push(text);
        }
    }

    parts.join(", ")
}
