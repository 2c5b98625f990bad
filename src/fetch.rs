//! Transport seam: the [`Fetcher`] trait and the default reqwest-backed
//! implementation.
//!
//! The engine aborts a request by dropping the returned future, so
//! implementations must tie the request's lifetime to the future (reqwest
//! does). Cancellation is therefore not threaded into this trait.

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;

/// Boxed future returned by [`Fetcher::fetch`].
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<FetchResponse, FetchError>> + Send>>;

/// Raw HTTP response, as far as the engine cares: a status and a body to
/// decode. Header handling stays inside the fetcher.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Injectable transport. Implemented by [`HttpFetcher`] for production and
/// by scripted fakes in tests; also the hook for proxying requests.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FetchFuture;
}

/// Default transport over a shared `reqwest::Client`.
///
/// Cheap to clone — the client is an `Arc` internally.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let client = self.client.clone();
        let url = url.to_string();
        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            Ok(FetchResponse { status, body })
        })
    }
}
