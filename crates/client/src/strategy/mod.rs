//! Cache strategies for intercepted requests.
//!
//! Each strategy is a policy over four primitives: partition lookup,
//! network fetch, partition write, and fallback.
//!
//! | Strategy | Cache hit | Cache miss | Network down |
//! |----------|-----------|------------|--------------|
//! | cache-first | return, no network | fetch + store | offline document (navigation) or error |
//! | network-first | ignored while online | fetch + store | cached entry, else synthetic 503 |
//! | stale-while-revalidate | return + background refresh | fetch + store | error on miss |

pub mod cache_first;
pub mod network_first;
pub mod stale_while_revalidate;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use fixie_core::{CacheStore, CachedResponse, Error, FetchRequest};

use crate::fetch::Network;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

const OFFLINE_HTML: &str = "<!doctype html><html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>Offline</h1><p>This page is not available offline yet.</p></body></html>";

/// Fetch policy applied to a request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    FromCache,
    FromNetwork,
    /// Synthesized locally because neither cache nor network could answer.
    Offline,
}

/// A response produced by a strategy.
#[derive(Debug)]
pub struct Fetched {
    pub response: CachedResponse,
    pub provenance: Provenance,
    /// Detached cache refresh started by stale-while-revalidate.
    ///
    /// Dropping the handle does not cancel the refresh.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Fetched {
    pub fn new(response: CachedResponse, provenance: Provenance) -> Self {
        Self { response, provenance, revalidation: None }
    }

    pub fn from_cache(response: CachedResponse) -> Self {
        Self::new(response, Provenance::FromCache)
    }

    pub fn from_network(response: CachedResponse) -> Self {
        Self::new(response, Provenance::FromNetwork)
    }
}

/// Where to find the offline document for navigation requests.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    pub partition: String,
    pub request: FetchRequest,
}

/// Shared capabilities handed to every strategy.
///
/// Cloning is cheap; the background refresh of stale-while-revalidate
/// holds its own clone so it outlives the foreground request.
#[derive(Clone)]
pub struct StrategyContext {
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn Network>,
    /// Upper bound on a single network attempt.
    pub timeout: Duration,
}

impl StrategyContext {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, timeout: Duration) -> Self {
        Self { store, network, timeout }
    }

    /// One network attempt bounded by `timeout`.
    pub async fn fetch_network(&self, request: &FetchRequest) -> Result<CachedResponse, Error> {
        match tokio::time::timeout(self.timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} did not answer within {}ms",
                request.url,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Partition lookup; store errors are logged and read as a miss so the
    /// request can still be served from the network.
    pub async fn lookup(&self, partition: &str, request: &FetchRequest) -> Option<CachedResponse> {
        match self.store.match_request(partition, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition, url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write a successful response for a cacheable request.
    ///
    /// Returns whether the response was stored. Write failures are logged;
    /// the caller still gets its response.
    pub async fn remember(&self, partition: &str, request: &FetchRequest, response: &CachedResponse) -> bool {
        if !request.is_cacheable() || !response.is_success() {
            return false;
        }
        match self.store.put(partition, request, response).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(partition, url = %request.url, error = %e, "cache write failed");
                false
            }
        }
    }

    /// The offline document, or a synthetic 503 page when it is not cached.
    ///
    /// Never fails: navigation requests must always receive a document.
    pub async fn offline_document(&self, fallback: &OfflineFallback, request: &FetchRequest) -> Fetched {
        match self.lookup(&fallback.partition, &fallback.request).await {
            Some(doc) => {
                tracing::info!(url = %request.url, "serving offline document");
                Fetched::from_cache(doc)
            }
            None => {
                tracing::warn!(url = %request.url, "offline document missing from cache");
                let page = CachedResponse::offline(&request.url, "text/html; charset=utf-8", OFFLINE_HTML);
                Fetched::new(page, Provenance::Offline)
            }
        }
    }
}

/// Turn a network failure into the terminal "nothing can answer" error.
pub(crate) fn no_fallback(request: &FetchRequest, err: Error) -> Error {
    if err.is_network_failure() {
        Error::NoFallbackAvailable(format!("{} {}: {err}", request.method, request.url))
    } else {
        err
    }
}
