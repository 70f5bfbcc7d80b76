//! Cache-first: serve the app shell without touching the network.

use fixie_core::{Error, FetchRequest};

use super::{Fetched, OfflineFallback, StrategyContext, no_fallback};

/// Serve from `partition` if present; otherwise fetch, store a copy of a
/// successful response, and return it.
///
/// A hit never issues a network request, which is what keeps the app usable
/// fully offline. When the network fails, navigation requests receive the
/// offline document and everything else gets `NoFallbackAvailable`.
pub async fn cache_first(
    ctx: &StrategyContext, partition: &str, request: &FetchRequest, offline: &OfflineFallback,
) -> Result<Fetched, Error> {
    if let Some(cached) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, url = %request.url, "cache hit");
        return Ok(Fetched::from_cache(cached));
    }

    tracing::debug!(partition, url = %request.url, "cache miss");
    match ctx.fetch_network(request).await {
        Ok(response) => {
            ctx.remember(partition, request, &response).await;
            Ok(Fetched::from_network(response))
        }
        Err(e) if request.navigate && e.is_network_failure() => Ok(ctx.offline_document(offline, request).await),
        Err(e) => Err(no_fallback(request, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::Provenance;
    use super::*;
    use fixie_core::CacheStore;

    const OFFLINE: &str = "https://example.com/offline.html";

    #[tokio::test]
    async fn test_hit_never_touches_network() {
        let (ctx, network, db) = context().await;
        let request = get("https://example.com/style.css");
        db.put(PARTITION, &request, &ok("https://example.com/style.css", "cached")).await.unwrap();
        network.respond("https://example.com/style.css", 200, "fresh");

        let fetched = cache_first(&ctx, PARTITION, &request, &fallback(OFFLINE)).await.unwrap();

        assert_eq!(fetched.provenance, Provenance::FromCache);
        assert_eq!(&fetched.response.body[..], b"cached");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let (ctx, network, db) = context().await;
        let request = get("https://example.com/app.js");
        network.respond("https://example.com/app.js", 200, "console.log(1)");

        let fetched = cache_first(&ctx, PARTITION, &request, &fallback(OFFLINE)).await.unwrap();
        assert_eq!(fetched.provenance, Provenance::FromNetwork);

        let stored = db.match_request(PARTITION, &request).await.unwrap().unwrap();
        assert_eq!(stored.body, fetched.response.body);

        // second request is served from the partition
        let again = cache_first(&ctx, PARTITION, &request, &fallback(OFFLINE)).await.unwrap();
        assert_eq!(again.provenance, Provenance::FromCache);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_status_returned_but_not_stored() {
        let (ctx, network, db) = context().await;
        let request = get("https://example.com/missing.png");
        network.respond("https://example.com/missing.png", 404, "not found");

        let fetched = cache_first(&ctx, PARTITION, &request, &fallback(OFFLINE)).await.unwrap();
        assert_eq!(fetched.response.status, 404);
        assert!(db.match_request(PARTITION, &request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_navigation_offline_gets_offline_document() {
        let (ctx, network, db) = context().await;
        db.put(PARTITION, &get(OFFLINE), &ok(OFFLINE, "<h1>offline</h1>")).await.unwrap();
        network.set_offline(true);

        let request = navigation("https://example.com/rides");
        let fetched = cache_first(&ctx, PARTITION, &request, &fallback(OFFLINE)).await.unwrap();

        assert_eq!(fetched.provenance, Provenance::FromCache);
        assert_eq!(&fetched.response.body[..], b"<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_subresource_offline_propagates() {
        let (ctx, network, _db) = context().await;
        network.set_offline(true);

        let result = cache_first(&ctx, PARTITION, &get("https://example.com/logo.png"), &fallback(OFFLINE)).await;
        assert!(matches!(result, Err(Error::NoFallbackAvailable(_))));
    }

    #[tokio::test]
    async fn test_navigation_timeout_gets_offline_document() {
        let (ctx, network, db) = context().await;
        db.put(PARTITION, &get(OFFLINE), &ok(OFFLINE, "offline")).await.unwrap();
        network.hang("https://example.com/stats");

        let fetched = cache_first(&ctx, PARTITION, &navigation("https://example.com/stats"), &fallback(OFFLINE))
            .await
            .unwrap();
        assert_eq!(&fetched.response.body[..], b"offline");
    }
}
