//! Stale-while-revalidate: instant CDN assets, refreshed in the background.

use fixie_core::{Error, FetchRequest};

use super::{Fetched, StrategyContext, no_fallback};

/// Return the cached entry immediately and refresh it in a detached task.
/// Without a cached entry, wait for the network; a failure there has no
/// fallback and propagates.
pub async fn stale_while_revalidate(
    ctx: &StrategyContext, partition: &str, request: &FetchRequest,
) -> Result<Fetched, Error> {
    if let Some(cached) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, url = %request.url, "serving stale copy, revalidating");
        let mut fetched = Fetched::from_cache(cached);
        fetched.revalidation = Some(spawn_revalidation(ctx.clone(), partition.to_string(), request.clone()));
        return Ok(fetched);
    }

    let response = ctx.fetch_network(request).await.map_err(|e| no_fallback(request, e))?;
    ctx.remember(partition, request, &response).await;
    Ok(Fetched::from_network(response))
}

/// The refresh owns everything it touches, so cancelling or dropping the
/// foreground response leaves it running.
fn spawn_revalidation(ctx: StrategyContext, partition: String, request: FetchRequest) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match ctx.fetch_network(&request).await {
            Ok(response) => {
                if ctx.remember(&partition, &request, &response).await {
                    tracing::debug!(partition = %partition, url = %request.url, "revalidated cached copy");
                }
            }
            Err(e) => tracing::debug!(partition = %partition, url = %request.url, error = %e, "revalidation failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::Provenance;
    use super::super::testing::*;
    use super::*;
    use fixie_core::CacheStore;
    use std::time::Duration;
    use tokio::time::Instant;

    const LEAFLET: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
    const CDN: &str = "app-cdn-v1";

    #[tokio::test(start_paused = true)]
    async fn test_hit_returns_cached_then_refreshes() {
        let (ctx, network, db) = context().await;
        db.put(CDN, &get(LEAFLET), &ok(LEAFLET, "v1")).await.unwrap();
        network.respond_after(LEAFLET, Duration::from_millis(300), "v2");

        let started = Instant::now();
        let fetched = stale_while_revalidate(&ctx, CDN, &get(LEAFLET)).await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(fetched.provenance, Provenance::FromCache);
        assert_eq!(&fetched.response.body[..], b"v1");

        fetched.revalidation.unwrap().await.unwrap();
        let stored = db.match_request(CDN, &get(LEAFLET)).await.unwrap().unwrap();
        assert_eq!(&stored.body[..], b"v2");
        assert_eq!(network.calls_for(LEAFLET), 1);
    }

    #[tokio::test]
    async fn test_refresh_survives_dropped_response() {
        let (ctx, network, db) = context().await;
        db.put(CDN, &get(LEAFLET), &ok(LEAFLET, "v1")).await.unwrap();
        network.respond_after(LEAFLET, Duration::from_millis(20), "v2");

        let fetched = stale_while_revalidate(&ctx, CDN, &get(LEAFLET)).await.unwrap();
        let handle = fetched.revalidation.unwrap();
        drop(fetched.response);

        handle.await.unwrap();
        let stored = db.match_request(CDN, &get(LEAFLET)).await.unwrap().unwrap();
        assert_eq!(&stored.body[..], b"v2");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_copy() {
        let (ctx, network, db) = context().await;
        db.put(CDN, &get(LEAFLET), &ok(LEAFLET, "v1")).await.unwrap();
        network.set_offline(true);

        let fetched = stale_while_revalidate(&ctx, CDN, &get(LEAFLET)).await.unwrap();
        fetched.revalidation.unwrap().await.unwrap();

        let stored = db.match_request(CDN, &get(LEAFLET)).await.unwrap().unwrap();
        assert_eq!(&stored.body[..], b"v1");
    }

    #[tokio::test]
    async fn test_miss_waits_for_network() {
        let (ctx, network, db) = context().await;
        network.respond(LEAFLET, 200, "v1");

        let fetched = stale_while_revalidate(&ctx, CDN, &get(LEAFLET)).await.unwrap();

        assert_eq!(fetched.provenance, Provenance::FromNetwork);
        assert!(fetched.revalidation.is_none());
        assert!(db.match_request(CDN, &get(LEAFLET)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_miss_offline_has_no_fallback() {
        let (ctx, network, _db) = context().await;
        network.set_offline(true);

        let result = stale_while_revalidate(&ctx, CDN, &get(LEAFLET)).await;
        assert!(matches!(result, Err(Error::NoFallbackAvailable(_))));
    }
}
