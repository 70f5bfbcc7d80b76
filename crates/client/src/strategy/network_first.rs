//! Network-first: freshest map tiles when online, cached tiles when not.

use fixie_core::{CachedResponse, Error, FetchRequest};

use super::{Fetched, Provenance, StrategyContext};

/// Try the network; store and return a successful answer. On network
/// failure serve the cached entry, or a synthetic 503 so the map can
/// degrade tile by tile instead of erroring.
///
/// Non-2xx answers from the network are passed through uncached.
pub async fn network_first(ctx: &StrategyContext, partition: &str, request: &FetchRequest) -> Result<Fetched, Error> {
    match ctx.fetch_network(request).await {
        Ok(response) => {
            ctx.remember(partition, request, &response).await;
            Ok(Fetched::from_network(response))
        }
        Err(e) if e.is_network_failure() => {
            if let Some(cached) = ctx.lookup(partition, request).await {
                tracing::debug!(partition, url = %request.url, error = %e, "network failed, serving cached copy");
                return Ok(Fetched::from_cache(cached));
            }
            tracing::debug!(partition, url = %request.url, error = %e, "network failed and nothing cached");
            Ok(Fetched::new(CachedResponse::offline(&request.url, "text/plain", "Offline"), Provenance::Offline))
        }
        Err(e) => Err(e),
    }
}
