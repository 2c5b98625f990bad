//! Address-autocomplete inference engine.
//!
//! Free-text keystrokes go in; a single normalized address comes out. The
//! engine debounces input, queries a remote address-lookup API, interprets
//! its multi-stage disambiguation protocol (cities, streets, house numbers,
//! postcodes, fully-resolved addresses) and drives one [`SessionState`]
//! record that a UI adapter renders. Rendering, styling and the server side
//! are explicitly not this crate's business; the transport is injectable
//! via [`Fetcher`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use address_infer::{CountryCode, InferConfig, InferCore, InferObserver, SessionState};
//!
//! struct Printer;
//! impl InferObserver for Printer {
//!     fn on_state_change(&self, state: &SessionState) {
//!         println!("{} suggestions", state.total_items());
//!     }
//! }
//!
//! # async fn demo() {
//! let mut config = InferConfig::new(CountryCode::Nl);
//! config.auth_key = Some("my-key".into());
//! let core = InferCore::with_transport(
//!     config,
//!     Arc::new(address_infer::HttpFetcher::new()),
//!     Arc::new(Printer),
//! );
//! core.handle_input("Klok");
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod highlight;
pub mod label;
pub mod observer;
pub mod state;
pub mod types;

mod segments;

pub use config::{CountryCode, InferConfig};
pub use engine::{InferCore, Key};
pub use error::FetchError;
pub use fetch::{FetchFuture, FetchResponse, Fetcher, HttpFetcher};
pub use highlight::{HighlightSegment, highlight_segments};
pub use label::format_label_by_input_order;
pub use observer::InferObserver;
pub use state::SessionState;
pub use types::{
    AddressValue, InferResponse, NumberOrText, Selection, Stage, Suggestion, SuggestionValue,
};
