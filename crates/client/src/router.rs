//! Request classification and strategy dispatch.
//!
//! Classification precedence is fixed: map-tile host, then CDN host, then
//! the offline document itself, else static asset. Host rules come first
//! because a tile or CDN URL may also look like a static path.

use regex::Regex;
use serde::Serialize;
use url::Url;

use fixie_core::{AppConfig, Error, FetchRequest, Generation};

use crate::strategy::{
    Fetched, OfflineFallback, Provenance, Strategy, StrategyContext, cache_first, network_first, no_fallback,
    stale_while_revalidate,
};

/// Class of an intercepted request, derived from its URL alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    StaticAsset,
    CdnAsset,
    MapTile,
    NavigationFallback,
}

impl RequestClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::StaticAsset | RequestClass::NavigationFallback => Strategy::CacheFirst,
            RequestClass::CdnAsset => Strategy::StaleWhileRevalidate,
            RequestClass::MapTile => Strategy::NetworkFirst,
        }
    }

    /// Partition of `generation` that stores this class.
    pub fn partition(self, generation: &Generation) -> String {
        match self {
            RequestClass::StaticAsset | RequestClass::NavigationFallback => generation.static_partition(),
            RequestClass::CdnAsset => generation.cdn_partition(),
            RequestClass::MapTile => generation.tiles_partition(),
        }
    }
}

/// Pure URL classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    tile_hosts: Regex,
    cdn_hosts: Vec<String>,
    offline_url: Url,
}

impl Classifier {
    pub fn new(tile_hosts: Regex, cdn_hosts: Vec<String>, offline_url: Url) -> Self {
        let cdn_hosts = cdn_hosts.into_iter().map(|h| h.to_lowercase()).collect();
        Self { tile_hosts, cdn_hosts, offline_url }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let tile_hosts = Regex::new(&config.map_tile_host_pattern)
            .map_err(|e| Error::InvalidInput(format!("map_tile_host_pattern: {e}")))?;
        let offline_url = config.offline_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(tile_hosts, config.cdn_hosts(), offline_url))
    }

    /// Total and deterministic: every URL maps to exactly one class.
    pub fn classify(&self, url: &Url) -> RequestClass {
        let host = url.host_str().map(str::to_lowercase).unwrap_or_default();

        if !host.is_empty() && self.tile_hosts.is_match(&host) {
            return RequestClass::MapTile;
        }
        if self.cdn_hosts.contains(&host) {
            return RequestClass::CdnAsset;
        }
        if Self::same_document(url, &self.offline_url) {
            return RequestClass::NavigationFallback;
        }
        RequestClass::StaticAsset
    }

    fn same_document(a: &Url, b: &Url) -> bool {
        a.scheme() == b.scheme()
            && a.host_str().map(str::to_lowercase) == b.host_str().map(str::to_lowercase)
            && a.port_or_known_default() == b.port_or_known_default()
            && a.path() == b.path()
    }

    pub fn offline_url(&self) -> &Url {
        &self.offline_url
    }
}

/// Classifies each request and runs the matching strategy against the
/// current generation's partitions.
#[derive(Clone)]
pub struct Router {
    classifier: Classifier,
    generation: Generation,
    ctx: StrategyContext,
}

impl Router {
    pub fn new(classifier: Classifier, generation: Generation, ctx: StrategyContext) -> Self {
        Self { classifier, generation, ctx }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        self.classifier.classify(url)
    }

    fn offline_fallback(&self) -> OfflineFallback {
        OfflineFallback {
            partition: self.generation.static_partition(),
            request: FetchRequest::get(self.classifier.offline_url().clone()),
        }
    }

    /// Answer an intercepted request from a controlled page.
    ///
    /// Navigation requests never fail with a network error: they get the
    /// offline document whatever the class.
    pub async fn handle(&self, request: &FetchRequest) -> Result<Fetched, Error> {
        if !request.is_cacheable() {
            return self.passthrough(request).await;
        }

        let class = self.classify(&request.url);
        let partition = class.partition(&self.generation);
        let offline = self.offline_fallback();
        tracing::debug!(url = %request.url, ?class, partition = %partition, "routing request");

        let result = match class.strategy() {
            Strategy::CacheFirst => cache_first(&self.ctx, &partition, request, &offline).await,
            Strategy::NetworkFirst => network_first(&self.ctx, &partition, request).await,
            Strategy::StaleWhileRevalidate => stale_while_revalidate(&self.ctx, &partition, request).await,
        };

        match result {
            Err(Error::NoFallbackAvailable(_)) if request.navigate => Ok(self.ctx.offline_document(&offline, request).await),
            Ok(fetched) if request.navigate && fetched.provenance == Provenance::Offline => {
                Ok(self.ctx.offline_document(&offline, request).await)
            }
            other => other,
        }
    }

    /// Go straight to the network without reading or writing any partition.
    ///
    /// Used for requests that can never be cached and for pages the worker
    /// does not control yet.
    pub async fn passthrough(&self, request: &FetchRequest) -> Result<Fetched, Error> {
        match self.ctx.fetch_network(request).await {
            Ok(response) => Ok(Fetched::from_network(response)),
            Err(e) if request.navigate && e.is_network_failure() => {
                Ok(self.ctx.offline_document(&self.offline_fallback(), request).await)
            }
            Err(e) => Err(no_fallback(request, e)),
        }
    }
}
