//! The inference engine core.
//!
//! Owns the session state and drives it through the multi-stage lookup
//! protocol: input debouncing, request cancellation and retry, response
//! mapping, segment editing, keyboard navigation and pagination.
//!
//! Public methods are synchronous — they mutate state under a lock, notify
//! the observer with a snapshot after releasing it, and schedule async
//! continuations (debounce timer, fetch task) on the current tokio runtime.
//! Every continuation holds a [`CancellationToken`] and re-checks it after
//! each await before touching state, so a late response from a superseded
//! request can never clobber a newer one. Continuations hold the engine
//! only weakly: dropping the last handle cancels the pending timer and
//! aborts the in-flight request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Url;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::{BACKOFF_BASE_MS, InferConfig};
use crate::error::FetchError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::label::format_label_by_input_order;
use crate::observer::{InferObserver, NullObserver};
use crate::segments;
use crate::state::SessionState;
use crate::types::{AddressValue, InferResponse, Selection, Stage, Suggestion, SuggestionValue};

// ── Keyboard input ────────────────────────────────────────────────────────────

/// Keys the engine reacts to. Adapters map everything else to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Space,
    Other,
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The address-inference engine. Cheap to clone — clones share one session.
///
/// Construct inside a tokio runtime; `handle_input`, `select_item` and
/// `load_more` spawn their continuations on it.
#[derive(Clone)]
pub struct InferCore {
    inner: Arc<Inner>,
}

struct Inner {
    config: InferConfig,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn InferObserver>,
    state: Mutex<SessionState>,
    /// Cancels the pending debounce timer. Replaced on every reschedule.
    debounce: Mutex<CancellationToken>,
    /// Cancels the in-flight request. Replaced on every issue.
    inflight: Mutex<CancellationToken>,
    /// Current pagination limit; grows via `load_more`, reset on fresh input.
    current_limit: Mutex<u32>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Tear-down: orphaned timers and requests must not outlive the session.
        self.debounce.get_mut().unwrap_or_else(|e| e.into_inner()).cancel();
        self.inflight.get_mut().unwrap_or_else(|e| e.into_inner()).cancel();
    }
}

/// Outcome of the retry loop, kept internal — the public surface only ever
/// sees state flags.
enum FetchRun {
    Cancelled,
    Failed(FetchError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl InferCore {
    /// Engine with the default HTTP transport and no observer.
    pub fn new(config: InferConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpFetcher::new()), Arc::new(NullObserver))
    }

    /// Engine with an injected transport and observer.
    pub fn with_transport(
        config: InferConfig,
        fetcher: Arc<dyn Fetcher>,
        observer: Arc<dyn InferObserver>,
    ) -> Self {
        let limit = config.effective_limit();
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                observer,
                state: Mutex::new(SessionState::default()),
                debounce: Mutex::new(CancellationToken::new()),
                inflight: Mutex::new(CancellationToken::new()),
                current_limit: Mutex::new(limit),
            }),
        }
    }

    /// Snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        lock(&self.inner.state).clone()
    }

    // ── Input ─────────────────────────────────────────────────────────────

    /// Process new text from the input field.
    ///
    /// Updates state synchronously (the loading flag flips before any
    /// network round-trip) and schedules a debounced fetch. Editing after a
    /// completed address invalidates it: the observer gets `on_select(None)`.
    pub fn handle_input(&self, text: &str) {
        let invalidates_final = {
            let st = lock(&self.inner.state);
            st.stage == Some(Stage::Final) && st.query != text
        };

        *lock(&self.inner.current_limit) = self.inner.config.effective_limit();

        self.update(|st| {
            st.query = text.to_string();
            st.is_valid = false;
            st.value = None;
            st.is_loading = !text.trim().is_empty();
            st.selected_index = -1;
            st.has_more = false;
            if invalidates_final {
                st.stage = None;
            }
        });

        if invalidates_final {
            debug!("edit after completion — invalidating resolved address");
            self.inner.observer.on_select(None);
        }

        self.schedule_fetch(text.to_string());
    }

    // ── Keyboard ──────────────────────────────────────────────────────────

    /// Handle a key press. `input_value` is the raw text currently in the
    /// field (which may be ahead of `state.query` mid-edit). Returns `true`
    /// when the adapter must suppress the key's default action.
    pub fn handle_key_down(&self, key: Key, input_value: &str) -> bool {
        let (total, selected) = {
            let st = lock(&self.inner.state);
            (st.total_items() as isize, st.selected_index)
        };

        if total > 0 {
            match key {
                Key::ArrowDown => {
                    let next = if selected + 1 >= total { 0 } else { selected + 1 };
                    self.update(|st| st.selected_index = next);
                    return true;
                }
                Key::ArrowUp => {
                    let next = if selected <= 0 { total - 1 } else { selected - 1 };
                    self.update(|st| st.selected_index = next);
                    return true;
                }
                Key::Enter if selected >= 0 => {
                    let item = lock(&self.inner.state).item_at(selected as usize).cloned();
                    if let Some(item) = item {
                        // Both selection outcomes reset the highlight.
                        self.select_item(&item);
                    }
                    return true;
                }
                _ => {}
            }
        }

        // Space is independent of list navigation: a bare house number gets
        // its comma inserted automatically.
        if key == Key::Space && self.should_auto_insert_comma(input_value) {
            let next = format!("{}, ", input_value.trim());
            self.update_query_and_fetch(next);
            return true;
        }

        false
    }

    fn should_auto_insert_comma(&self, value: &str) -> bool {
        if !value.contains(',') && segments::is_short_number(value.trim()) {
            return true;
        }
        if lock(&self.inner.state).stage == Some(Stage::StreetNumber) {
            return segments::is_short_number(segments::last_fragment(value));
        }
        false
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// Select a suggestion (click, tap, or Enter). Cancels the pending
    /// debounce and any in-flight request first. Returns `true` when the
    /// selection was terminal — the address is resolved and `on_select`
    /// fired.
    pub fn select_item(&self, item: &Suggestion) -> bool {
        self.cancel_pending();
        debug!(label = %item.label, "selecting item");

        let stage = lock(&self.inner.state).stage;
        let address = item.address().filter(|a| !a.is_empty()).cloned();

        let finishes = stage == Some(Stage::Final)
            || address.as_ref().is_some_and(AddressValue::is_complete);
        if finishes {
            let label = address
                .as_ref()
                .and_then(AddressValue::canonical_label)
                .unwrap_or_else(|| item.label.clone());
            self.finish_selection(label, address);
            return true;
        }

        // A string value, when present, replaces the label in the query.
        let text = match &item.value {
            Some(SuggestionValue::Text(s)) => s.clone(),
            _ => item.label.clone(),
        };
        self.continue_selection(&text, item.subtitle.as_deref())
    }

    /// Terminal transition: one label in the box, one resolved value out.
    fn finish_selection(&self, label: String, value: Option<AddressValue>) {
        let selection = match &value {
            Some(v) => Selection::Address(v.clone()),
            None => Selection::Text(label.clone()),
        };
        debug!(query = %label, "selection finished");
        self.update(move |st| {
            st.query = label;
            st.clear_lists();
            st.has_more = false;
            st.is_valid = true;
            st.stage = Some(Stage::Final);
            st.value = value;
            // The highlight must not outlive the lists it pointed into.
            st.selected_index = -1;
        });
        self.inner.observer.on_select(Some(&selection));
    }

    /// Non-terminal selection: splice the choice into the query and fetch
    /// the next stage. Returns `true` in the stages that finish with a bare
    /// label (direct / addition).
    fn continue_selection(&self, text: &str, subtitle: Option<&str>) -> bool {
        let (stage, query) = {
            let st = lock(&self.inner.state);
            (st.stage, st.query.clone())
        };

        // Contextual selection: the item carries its parent context, e.g. a
        // street with its city as subtitle.
        if let Some(subtitle) = subtitle {
            if matches!(stage, Some(Stage::City | Stage::Street | Stage::Mixed)) {
                let next = if stage == Some(Stage::City) {
                    format!("{subtitle}, {text}, ")
                } else {
                    match segments::prefix_before_last_comma(&query) {
                        // A bare house number already in the query implies the
                        // subtitle context; repeating it would double up.
                        Some(prefix) if segments::has_numeric_segment(prefix) => {
                            format!("{prefix} {text}, ")
                        }
                        Some(prefix) => format!("{prefix} {text}, {subtitle}, "),
                        None => format!("{text}, {subtitle}, "),
                    }
                };
                self.update_query_and_fetch(next);
                return false;
            }
        }

        if matches!(stage, Some(Stage::Direct | Stage::Addition)) {
            self.finish_selection(text.to_string(), None);
            return true;
        }

        let first_segment = !query.contains(',')
            && matches!(stage, Some(Stage::City | Stage::Street | Stage::StreetNumberFirst));
        let next = if first_segment {
            format!("{text}, ")
        } else {
            let mut next = segments::replace_last_segment(&query, text);
            // House numbers stay open — the user may still add an addition.
            if stage != Some(Stage::StreetNumber) {
                next.push_str(", ");
            }
            next
        };
        self.update_query_and_fetch(next);
        false
    }

    // ── Pagination ────────────────────────────────────────────────────────

    /// Request the next page for the current query. No-op while a fetch is
    /// already in flight; bypasses the debounce otherwise.
    pub fn load_more(&self) {
        let (is_loading, query) = {
            let st = lock(&self.inner.state);
            (st.is_loading, st.query.clone())
        };
        if is_loading {
            trace!("load_more ignored while loading");
            return;
        }

        let limit = {
            let mut limit = lock(&self.inner.current_limit);
            *limit += self.inner.config.effective_limit();
            *limit
        };
        debug!(limit, "loading more results");

        self.update(|st| st.is_loading = true);
        self.start_fetch(query);
    }

    // ── Fetch orchestration ───────────────────────────────────────────────

    /// (Re)start the debounce timer for `query`. Only the latest input ever
    /// reaches the network. The timer task holds the engine weakly — when
    /// the last handle drops, [`Inner`]'s drop cancels the token and the
    /// timer exits without fetching.
    fn schedule_fetch(&self, query: String) {
        let token = CancellationToken::new();
        {
            let mut slot = lock(&self.inner.debounce);
            slot.cancel();
            *slot = token.clone();
        }

        let delay = self.inner.config.effective_debounce();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("debounce superseded");
                }
                _ = sleep(delay) => {
                    match weak.upgrade() {
                        Some(inner) => InferCore { inner }.start_fetch(query),
                        None => trace!("engine gone before fetch"),
                    }
                }
            }
        });
    }

    fn cancel_pending(&self) {
        lock(&self.inner.debounce).cancel();
        lock(&self.inner.inflight).cancel();
    }

    /// Issue the lookup for `query` now. Synchronous: the state flips
    /// happen immediately; the round-trip runs on a spawned task that holds
    /// the engine weakly and re-checks its token before writing anything
    /// back, so neither a dropped engine nor a superseded request can leak
    /// a result into state.
    fn start_fetch(&self, query: String) {
        if query.trim().is_empty() {
            // Cleared input: abort whatever is running and reset, but keep
            // the text exactly as typed so the box does not flash.
            lock(&self.inner.inflight).cancel();
            self.update(|st| {
                *st = SessionState {
                    query: std::mem::take(&mut st.query),
                    ..SessionState::default()
                };
            });
            return;
        }

        let token = CancellationToken::new();
        {
            let mut slot = lock(&self.inner.inflight);
            slot.cancel();
            *slot = token.clone();
        }

        self.update(|st| st.is_error = false);

        let url = match self.build_url(&query) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not build lookup url");
                self.update(|st| {
                    st.is_error = true;
                    st.is_loading = false;
                });
                return;
            }
        };

        debug!(query_len = query.len(), "issuing lookup");

        let fetcher = Arc::clone(&self.inner.fetcher);
        let max_retries = self.inner.config.effective_retries();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let result = fetch_with_retry(fetcher.as_ref(), &url, max_retries, &token).await;
            let Some(inner) = weak.upgrade() else {
                trace!("engine gone, dropping result");
                return;
            };
            let core = InferCore { inner };
            match result {
                Ok(response) => {
                    if token.is_cancelled() {
                        trace!("stale response dropped");
                        return;
                    }
                    core.apply_response(&query, response);
                }
                Err(FetchRun::Cancelled) => {
                    trace!("lookup cancelled");
                }
                Err(FetchRun::Failed(e)) => {
                    if token.is_cancelled() {
                        return;
                    }
                    warn!(error = %e, "lookup failed");
                    core.update(|st| {
                        st.is_error = true;
                        st.is_loading = false;
                    });
                }
            }
        });
    }

    fn build_url(&self, query: &str) -> Result<String, FetchError> {
        let config = &self.inner.config;
        let base = match &config.api_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "{}/infer/{}",
                crate::config::DEFAULT_API_URL,
                config.country.as_param()
            ),
        };
        let mut url = Url::parse(&base)
            .map_err(|e| FetchError::Transport(format!("invalid api url '{base}': {e}")))?;

        let limit = *lock(&self.inner.current_limit);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(auth_key) = &config.auth_key {
                pairs.append_pair("authKey", auth_key);
            }
            pairs.append_pair("query", query);
            pairs.append_pair("limit", &limit.to_string());
            // The default base encodes the country in the path; an explicit
            // override needs it spelled out.
            if config.api_url.is_some() {
                pairs.append_pair("country", config.country.as_param());
            }
        }
        Ok(url.into())
    }

    // ── Response mapping ──────────────────────────────────────────────────

    fn apply_response(&self, query: &str, response: InferResponse) {
        let limit = *lock(&self.inner.current_limit) as usize;

        let suggestions = reformat_labels(query, dedup(response.suggestions));

        let mut auto_select: Option<Suggestion> = None;
        self.update(|st| {
            st.stage = Some(response.stage);
            st.is_loading = false;

            let mixed_has_lists = response.stage == Stage::Mixed
                && !(response.cities.is_empty() && response.streets.is_empty());
            if mixed_has_lists {
                st.cities = response.cities;
                st.streets = response.streets;
                st.suggestions = Vec::new();
            } else {
                // Non-mixed stages, and the mixed fallback when both lists
                // came back empty but flat suggestions did not.
                st.suggestions = suggestions;
                st.cities = Vec::new();
                st.streets = Vec::new();

                if response.stage == Stage::Final && st.suggestions.len() == 1 {
                    auto_select = st.suggestions.first().cloned();
                }
            }

            st.has_more = st.total_items() >= limit;
            st.is_valid = response.stage == Stage::Final;
        });

        if let Some(item) = auto_select {
            debug!(label = %item.label, "single final suggestion — auto-completing");
            self.select_item(&item);
        }
    }

    fn update_query_and_fetch(&self, next: String) {
        self.update(|st| {
            st.query = next.clone();
            st.clear_lists();
            st.is_loading = true;
            st.is_valid = false;
            st.selected_index = -1;
        });
        self.schedule_fetch(next);
    }

    /// Apply `f` under the lock, then notify the observer with a snapshot
    /// taken after the lock is released — observers may re-enter the engine.
    fn update<F: FnOnce(&mut SessionState)>(&self, f: F) {
        let snapshot = {
            let mut st = lock(&self.inner.state);
            f(&mut st);
            st.clone()
        };
        self.inner.observer.on_state_change(&snapshot);
    }
}

/// One request plus up to `max_retries` re-attempts with exponential
/// backoff. The token is raced at every await — a cancelled run exits
/// without a result and without touching state.
async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    max_retries: u32,
    token: &CancellationToken,
) -> Result<InferResponse, FetchRun> {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            _ = token.cancelled() => return Err(FetchRun::Cancelled),
            result = fetcher.fetch(url) => result,
        };

        let error = match result {
            Ok(response) if response.ok() => {
                return serde_json::from_str::<InferResponse>(&response.body)
                    .map_err(|e| FetchRun::Failed(FetchError::Decode(e.to_string())));
            }
            Ok(response) => FetchError::Status(response.status),
            Err(e) => e,
        };

        if !error.is_retryable() || attempt >= max_retries {
            return Err(FetchRun::Failed(error));
        }

        let delay = Duration::from_millis(BACKOFF_BASE_MS << attempt);
        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying lookup");
        tokio::select! {
            _ = token.cancelled() => return Err(FetchRun::Cancelled),
            _ = sleep(delay) => {}
        }
        attempt += 1;
    }
}

/// Drop duplicate `{label, subtitle, value}` triples, keeping first-seen order.
fn dedup(items: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedup_key()))
        .collect()
}

/// Rewrite structured suggestions' labels to mirror the user's typing order.
fn reformat_labels(query: &str, items: Vec<Suggestion>) -> Vec<Suggestion> {
    items
        .into_iter()
        .map(|mut item| {
            if let Some(address) = item.address() {
                if !address.is_empty() {
                    let formatted = format_label_by_input_order(query, address);
                    if !formatted.is_empty() {
                        item.label = formatted;
                    }
                }
            }
            item
        })
        .collect()
}
