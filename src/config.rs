//! Engine configuration and protocol defaults.
//!
//! The engine is configured programmatically by the embedding UI adapter;
//! there is no config file. Out-of-range values are clamped, not rejected:
//! the debounce interval has an enforced floor to protect the remote API,
//! and the retry count is capped.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default API host + version prefix. The country is appended to the path.
pub const DEFAULT_API_URL: &str = "https://api.pro6pp.nl/v2";

/// Suggestions requested per page; also the `load_more` increment.
pub const DEFAULT_LIMIT: u32 = 20;

/// Default debounce interval.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Lower bound on the debounce interval, enforced regardless of config.
pub const MIN_DEBOUNCE_MS: u64 = 50;

/// Upper bound on the configured retry count.
pub const MAX_RETRIES_CAP: u32 = 10;

/// Base delay for exponential retry backoff (`200ms × 2^attempt`).
pub const BACKOFF_BASE_MS: u64 = 200;

// ── Country ───────────────────────────────────────────────────────────────────

/// Supported ISO 3166-1 alpha-2 country codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryCode {
    Nl,
    De,
}

impl CountryCode {
    /// Lowercase form used in the URL path and the `country` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            CountryCode::Nl => "nl",
            CountryCode::De => "de",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CountryCode::Nl => "NL",
            CountryCode::De => "DE",
        })
    }
}

impl FromStr for CountryCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NL" => Ok(CountryCode::Nl),
            "DE" => Ok(CountryCode::De),
            other => Err(format!("unsupported country code: '{other}'")),
        }
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Engine configuration.
///
/// Callbacks and the transport are not part of this struct — they are passed
/// to [`InferCore::with_transport`](crate::InferCore::with_transport) so the
/// config stays plain data.
#[derive(Debug, Clone)]
pub struct InferConfig {
    /// Country to perform lookups in.
    pub country: CountryCode,
    /// API authorization key. Optional when requests go through a proxy.
    pub auth_key: Option<String>,
    /// Explicit endpoint override. When set, query parameters (including an
    /// explicit `country`) are appended to it; when unset, the default host
    /// is used with the country templated into the path.
    pub api_url: Option<String>,
    /// Suggestions requested per page.
    pub limit: u32,
    /// Debounce interval in milliseconds. Clamped to [`MIN_DEBOUNCE_MS`].
    pub debounce_ms: u64,
    /// Retry attempts for transient failures. Clamped to [`MAX_RETRIES_CAP`].
    pub max_retries: u32,
}

impl InferConfig {
    pub fn new(country: CountryCode) -> Self {
        Self {
            country,
            auth_key: None,
            api_url: None,
            limit: DEFAULT_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_retries: 0,
        }
    }

    /// Debounce interval with the floor applied.
    pub(crate) fn effective_debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.max(MIN_DEBOUNCE_MS))
    }

    /// Retry count with the cap applied.
    pub(crate) fn effective_retries(&self) -> u32 {
        self.max_retries.min(MAX_RETRIES_CAP)
    }

    /// Page size, never zero even if misconfigured.
    pub(crate) fn effective_limit(&self) -> u32 {
        self.limit.max(1)
    }
}
