//! The worker event loop.
//!
//! Lifecycle events go through a single mpsc queue and are handled one at
//! a time, each acknowledged on a oneshot channel. Intercepted fetches do
//! not queue behind them: [`WorkerHandle::fetch`] reads the published
//! status and spawns its own task.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use fixie_client::fetch::canonicalize;
use fixie_client::{
    Classifier, Fetched, Network, RequestClass, Router, StrategyContext, precache_all, precache_best_effort,
};
use fixie_core::{AppConfig, CacheStore, Error, FetchRequest, Generation};

use crate::lifecycle::{ClientMessage, Lifecycle, LifecycleEvent, LifecycleState, Step};

const QUEUE_DEPTH: usize = 32;

/// Build the router for `config` over the given store and network.
pub fn build_router(config: &AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Router, Error> {
    let ctx = StrategyContext::new(store, network, config.timeout());
    Ok(Router::new(Classifier::from_config(config)?, config.generation(), ctx))
}

/// What install precaches and how it finishes.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub static_assets: Vec<Url>,
    pub cdn_assets: Vec<Url>,
    pub concurrency: usize,
    pub auto_skip_waiting: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let base = config.base_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let static_assets = config
            .static_asset_urls()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let cdn_assets = config
            .cdn_assets
            .iter()
            .map(|asset| canonicalize(asset, &base).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            static_assets,
            cdn_assets,
            concurrency: config.install_concurrency,
            auto_skip_waiting: config.auto_skip_waiting,
        })
    }
}

/// A CDN asset that could not be precached.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FailedAsset {
    pub url: String,
    pub error: String,
}

/// Result of the last successful install.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct InstallSummary {
    pub static_cached: usize,
    pub cdn_cached: usize,
    pub cdn_failed: Vec<FailedAsset>,
}

/// Snapshot of the worker published after every transition.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub controls_clients: bool,
    pub skip_waiting: bool,
    pub generation: Generation,
    pub install: Option<InstallSummary>,
    /// Partitions removed by activation, oldest first.
    pub deleted_partitions: Vec<String>,
    pub installed_at: Option<String>,
    pub activated_at: Option<String>,
}

/// A fetch answered by the worker.
#[derive(Debug)]
pub struct Routed {
    /// Set when the request went through the router.
    pub class: Option<RequestClass>,
    pub controlled: bool,
    pub fetched: Fetched,
}

struct Command {
    event: LifecycleEvent,
    reply: oneshot::Sender<Result<WorkerStatus, Error>>,
}

struct Worker {
    router: Router,
    settings: WorkerSettings,
    lifecycle: Lifecycle,
    install: Option<InstallSummary>,
    deleted: Vec<String>,
    installed_at: Option<String>,
    activated_at: Option<String>,
    status: watch::Sender<WorkerStatus>,
}

impl Worker {
    fn snapshot(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.lifecycle.state(),
            controls_clients: self.lifecycle.controls_clients(),
            skip_waiting: self.lifecycle.skip_waiting(),
            generation: self.router.generation().clone(),
            install: self.install.clone(),
            deleted_partitions: self.deleted.clone(),
            installed_at: self.installed_at.clone(),
            activated_at: self.activated_at.clone(),
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.snapshot());
    }

    fn enter(&mut self, state: LifecycleState) {
        self.lifecycle.enter(state);
        self.publish();
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(generation = %self.router.generation().version, "worker event loop started");
        while let Some(Command { event, reply }) = commands.recv().await {
            let result = self.dispatch(event).await.map(|()| self.snapshot());
            if reply.send(result).is_err() {
                tracing::debug!(?event, "event sender went away before acknowledgement");
            }
        }
        tracing::info!("worker event loop stopped");
    }

    async fn dispatch(&mut self, event: LifecycleEvent) -> Result<(), Error> {
        match self.lifecycle.step(event)? {
            Step::Install => self.install().await,
            Step::Activate => self.activate().await,
            Step::DeferSkipWaiting => {
                tracing::info!("skip-waiting requested before install; will activate once installed");
                self.lifecycle.request_skip_waiting();
                self.publish();
                Ok(())
            }
            Step::Retire => {
                self.enter(LifecycleState::Superseded);
                Ok(())
            }
            Step::Ignore => {
                tracing::debug!(?event, state = ?self.lifecycle.state(), "event has no effect");
                Ok(())
            }
        }
    }

    async fn install(&mut self) -> Result<(), Error> {
        self.enter(LifecycleState::Installing);

        match self.populate().await {
            Ok(summary) => {
                self.install = Some(summary);
                self.installed_at = Some(chrono::Utc::now().to_rfc3339());
                if self.settings.auto_skip_waiting {
                    self.lifecycle.request_skip_waiting();
                }
                self.enter(LifecycleState::Installed);

                if self.lifecycle.skip_waiting() { self.activate().await } else { Ok(()) }
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.enter(LifecycleState::Redundant);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<InstallSummary, Error> {
        let ctx = self.router.context();
        let generation = self.router.generation();

        for partition in generation.partition_names() {
            ctx.store.open(&partition).await?;
        }

        let static_cached = precache_all(
            ctx,
            &generation.static_partition(),
            &self.settings.static_assets,
            self.settings.concurrency,
        )
        .await?;

        let report = precache_best_effort(
            ctx,
            &generation.cdn_partition(),
            &self.settings.cdn_assets,
            self.settings.concurrency,
        )
        .await;

        Ok(InstallSummary {
            static_cached,
            cdn_cached: report.cached.len(),
            cdn_failed: report
                .failed
                .into_iter()
                .map(|(url, error)| FailedAsset { url: url.to_string(), error })
                .collect(),
        })
    }

    async fn activate(&mut self) -> Result<(), Error> {
        self.enter(LifecycleState::Activating);

        let keep = self.router.generation().partition_names();
        match self.router.context().store.delete_except(&keep).await {
            Ok(deleted) => {
                for partition in &deleted {
                    tracing::info!(partition = %partition, "deleted partition from previous generation");
                }
                self.deleted.extend(deleted);
                self.activated_at = Some(chrono::Utc::now().to_rfc3339());
                self.lifecycle.claim();
                self.publish();
                tracing::info!("claimed clients");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed");
                self.enter(LifecycleState::Installed);
                Err(e)
            }
        }
    }
}

/// Cloneable entry point to a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<WorkerStatus>,
    router: Router,
}

impl WorkerHandle {
    /// Start the event loop on the current runtime.
    pub fn spawn(router: Router, settings: WorkerSettings) -> Self {
        let lifecycle = Lifecycle::default();
        let initial = WorkerStatus {
            state: lifecycle.state(),
            controls_clients: false,
            skip_waiting: false,
            generation: router.generation().clone(),
            install: None,
            deleted_partitions: Vec::new(),
            installed_at: None,
            activated_at: None,
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let (commands_tx, commands_rx) = mpsc::channel(QUEUE_DEPTH);

        let worker = Worker {
            router: router.clone(),
            settings,
            lifecycle,
            install: None,
            deleted: Vec::new(),
            installed_at: None,
            activated_at: None,
            status: status_tx,
        };
        tokio::spawn(worker.run(commands_rx));

        Self { commands: commands_tx, status: status_rx, router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Queue a lifecycle event and wait until the loop has handled it.
    pub async fn send(&self, event: LifecycleEvent) -> Result<WorkerStatus, Error> {
        let (reply, ack) = oneshot::channel();
        self.commands
            .send(Command { event, reply })
            .await
            .map_err(|_| Error::WorkerStopped)?;
        ack.await.map_err(|_| Error::WorkerStopped)?
    }

    pub async fn install(&self) -> Result<WorkerStatus, Error> {
        self.send(LifecycleEvent::Install).await
    }

    pub async fn activate(&self) -> Result<WorkerStatus, Error> {
        self.send(LifecycleEvent::Activate).await
    }

    pub async fn supersede(&self) -> Result<WorkerStatus, Error> {
        self.send(LifecycleEvent::Supersede).await
    }

    /// Deliver a page message such as `SKIP_WAITING`.
    pub async fn message(&self, kind: &str) -> Result<WorkerStatus, Error> {
        let message: ClientMessage = kind.parse()?;
        self.send(message.into()).await
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.borrow().clone()
    }

    /// Answer an intercepted fetch on its own task.
    ///
    /// Pages are routed only while the worker controls them; otherwise the
    /// request goes straight to the network.
    pub async fn fetch(&self, request: FetchRequest) -> Result<Routed, Error> {
        let controlled = self.status.borrow().controls_clients;
        let router = self.router.clone();

        let task = tokio::spawn(async move {
            if controlled {
                let class = request.is_cacheable().then(|| router.classify(&request.url));
                router
                    .handle(&request)
                    .await
                    .map(|fetched| Routed { class, controlled, fetched })
            } else {
                router
                    .passthrough(&request)
                    .await
                    .map(|fetched| Routed { class: None, controlled, fetched })
            }
        });

        task.await.map_err(|e| {
            tracing::error!(error = %e, "fetch task did not complete");
            Error::WorkerStopped
        })?
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use fixie_client::fetch::mock::MockNetwork;
    use fixie_core::CacheDb;

    pub fn config() -> AppConfig {
        AppConfig {
            origin: "https://fixie.run".into(),
            cache_prefix: "app".into(),
            cache_version: "v2".into(),
            cdn_assets: vec![
                "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js".into(),
                "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css".into(),
                "https://cdn.jsdelivr.net/npm/chart.js".into(),
                "https://cdn.jsdelivr.net/npm/dayjs".into(),
                "https://unpkg.com/unreachable.js".into(),
            ],
            timeout_ms: 1_000,
            ..Default::default()
        }
    }

    pub fn serve_shell(network: &MockNetwork, config: &AppConfig) {
        for url in config.static_asset_urls().unwrap() {
            network.respond(url.as_str(), 200, "shell");
        }
        for url in &config.cdn_assets[..4] {
            network.respond(url, 200, "lib");
        }
        network.fail(&config.cdn_assets[4]);
    }

    pub fn spawn(config: &AppConfig, db: Arc<CacheDb>, network: Arc<MockNetwork>) -> WorkerHandle {
        let router = build_router(config, db, network).unwrap();
        WorkerHandle::spawn(router, WorkerSettings::from_config(config).unwrap())
    }

    pub async fn setup(config: &AppConfig) -> (WorkerHandle, Arc<MockNetwork>, Arc<CacheDb>) {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(MockNetwork::new());
        serve_shell(&network, config);
        (spawn(config, db.clone(), network.clone()), network, db)
    }

    pub fn get(url: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(url).unwrap())
    }
}
