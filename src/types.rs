//! Domain and wire types for the address-inference protocol.
//!
//! The remote API is duck-typed in places — a suggestion's `value` may be a
//! plain string or a structured address, `street_number` and `count` may be
//! numbers or strings. Those shapes are modeled as untagged unions here so
//! the rest of the crate never inspects raw JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Stage ─────────────────────────────────────────────────────────────────────

/// Current disambiguation phase of the address-resolution protocol.
///
/// The wire vocabulary is snake_case; the older `house_number` /
/// `house_number_first` spellings some server versions emit are accepted as
/// aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No input yet.
    Empty,
    /// The server returned parallel city and street candidate lists.
    Mixed,
    /// Selecting a street.
    Street,
    /// Selecting a city.
    City,
    /// Entering a postcode.
    Postcode,
    /// Entering a house number.
    #[serde(alias = "house_number")]
    StreetNumber,
    /// Number-before-street entry mode.
    #[serde(alias = "house_number_first")]
    StreetNumberFirst,
    /// Selecting a house-number addition (e.g. "A", "III").
    Addition,
    /// Direct hit, typically via a full postcode.
    Direct,
    /// A complete address has been identified.
    Final,
}

// ── Duck-typed scalars ────────────────────────────────────────────────────────

/// Wire field that may arrive as a JSON number or string
/// (`street_number`, `count`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Int(u64),
    Text(String),
}

impl fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOrText::Int(n) => write!(f, "{n}"),
            NumberOrText::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for NumberOrText {
    fn from(n: u64) -> Self {
        NumberOrText::Int(n)
    }
}

impl From<&str> for NumberOrText {
    fn from(s: &str) -> Self {
        NumberOrText::Text(s.to_string())
    }
}

// ── Address value ─────────────────────────────────────────────────────────────

/// Structured address data attached to a suggestion or produced by a
/// terminal selection. Unknown fields the API adds are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<NumberOrText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addition: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AddressValue {
    /// True when no field at all is populated.
    pub fn is_empty(&self) -> bool {
        self.street.is_none()
            && self.city.is_none()
            && self.street_number.is_none()
            && self.postcode.is_none()
            && self.addition.is_none()
            && self.extra.is_empty()
    }

    /// Street, number and city present — enough to finish a selection and
    /// build the canonical label.
    pub fn is_complete(&self) -> bool {
        self.street.is_some() && self.street_number.is_some() && self.city.is_some()
    }

    /// Canonical display form: `street number[ addition], [postcode, ]city`.
    ///
    /// Returns `None` unless [`is_complete`](Self::is_complete).
    pub fn canonical_label(&self) -> Option<String> {
        let (street, number, city) = match (&self.street, &self.street_number, &self.city) {
            (Some(s), Some(n), Some(c)) => (s, n, c),
            _ => return None,
        };
        let mut label = format!("{street} {number}");
        if let Some(addition) = &self.addition {
            label.push(' ');
            label.push_str(addition);
        }
        label.push_str(", ");
        if let Some(postcode) = &self.postcode {
            label.push_str(postcode);
            label.push_str(", ");
        }
        label.push_str(city);
        Some(label)
    }
}

// ── Suggestions ───────────────────────────────────────────────────────────────

/// Payload attached to a suggestion: either an opaque replacement string or
/// structured address data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuggestionValue {
    Address(AddressValue),
    Text(String),
}

/// A single item in a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Display text.
    pub label: String,
    /// Present only when this item fully or partially resolves an address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SuggestionValue>,
    /// Disambiguating context, e.g. the parent city of a street.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Result-count hint for this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<NumberOrText>,
}

impl Suggestion {
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            subtitle: None,
            count: None,
        }
    }

    /// Structured address carried by this item, if any.
    pub fn address(&self) -> Option<&AddressValue> {
        match &self.value {
            Some(SuggestionValue::Address(addr)) => Some(addr),
            _ => None,
        }
    }

    /// Composite identity used for de-duplication: label, subtitle and the
    /// serialized value. First-seen order wins.
    pub(crate) fn dedup_key(&self) -> String {
        let value = self
            .value
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok())
            .unwrap_or_else(|| "{}".to_string());
        format!(
            "{}|{}|{}",
            self.label,
            self.subtitle.as_deref().unwrap_or(""),
            value
        )
    }
}

/// Payload of a terminal selection handed to the observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A fully structured address.
    Address(AddressValue),
    /// Only a display string was available (direct / addition stages).
    Text(String),
}

// ── Wire response ─────────────────────────────────────────────────────────────

/// JSON body of a successful lookup response.
#[derive(Debug, Clone, Deserialize)]
pub struct InferResponse {
    pub stage: Stage,
    #[serde(default)]
    pub cities: Vec<Suggestion>,
    #[serde(default)]
    pub streets: Vec<Suggestion>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}
