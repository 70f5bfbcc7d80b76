//! Install-time population of partitions.
//!
//! Both helpers fetch with bounded concurrency. `precache_all` is
//! all-or-nothing (the app shell must be complete offline);
//! `precache_best_effort` keeps whatever succeeded.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use fixie_core::{CachedResponse, Error, FetchRequest};

use crate::strategy::StrategyContext;

/// Outcome of a best-effort precache.
#[derive(Debug, Default)]
pub struct PrecacheReport {
    pub cached: Vec<Url>,
    pub failed: Vec<(Url, String)>,
}

/// Fetch every URL, at most `concurrency` at a time.
///
/// Results come back in input order. A non-2xx status counts as a failure.
async fn fetch_each(ctx: &StrategyContext, urls: &[Url], concurrency: usize) -> Vec<Result<CachedResponse, Error>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for (index, url) in urls.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let ctx = ctx.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let request = FetchRequest::get(url);
            let result = match ctx.fetch_network(&request).await {
                Ok(response) if response.is_success() => Ok(response),
                Ok(response) => Err(Error::NetworkUnavailable(format!("{}: status {}", request.url, response.status))),
                Err(e) => Err(e),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<CachedResponse, Error>>> = (0..urls.len()).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::error!(error = %e, "precache task aborted"),
        }
    }

    slots
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| slot.unwrap_or_else(|| Err(Error::NetworkUnavailable(format!("{url}: task aborted")))))
        .collect()
}

/// Fetch and store every URL, or store nothing.
///
/// # Errors
///
/// `InstallPopulationFailure` naming the first URL that could not be fetched,
/// or the store error if the batch write fails.
pub async fn precache_all(
    ctx: &StrategyContext, partition: &str, urls: &[Url], concurrency: usize,
) -> Result<usize, Error> {
    let results = fetch_each(ctx, urls, concurrency).await;

    let mut entries = Vec::with_capacity(urls.len());
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(response) => entries.push((FetchRequest::get(url.clone()), response)),
            Err(e) => return Err(Error::InstallPopulationFailure(format!("{url}: {e}"))),
        }
    }

    ctx.store
        .put_all(partition, &entries)
        .await
        .map_err(|e| Error::InstallPopulationFailure(format!("writing {partition}: {e}")))?;

    tracing::info!(partition, count = entries.len(), "precached app shell");
    Ok(entries.len())
}

/// Fetch and store each URL independently; failures are logged and reported
/// but never abort the rest.
pub async fn precache_best_effort(
    ctx: &StrategyContext, partition: &str, urls: &[Url], concurrency: usize,
) -> PrecacheReport {
    let results = fetch_each(ctx, urls, concurrency).await;
    let mut report = PrecacheReport::default();

    for (url, result) in urls.iter().zip(results) {
        let request = FetchRequest::get(url.clone());
        let outcome = match result {
            Ok(response) => ctx.store.put(partition, &request, &response).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => report.cached.push(url.clone()),
            Err(e) => {
                tracing::warn!(partition, url = %url, error = %e, "skipping asset that failed to precache");
                report.failed.push((url.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(partition, cached = report.cached.len(), failed = report.failed.len(), "precached CDN assets");
    report
}
