//! sw_install, sw_activate, sw_message and sw_status tool implementations.
//!
//! Each lifecycle tool queues one event and returns the worker status once
//! the event loop has handled it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use fixie_core::{CacheStore, Error};

use crate::tools::json_result;
use crate::worker::{WorkerHandle, WorkerStatus};

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type posted by the page, e.g. "SKIP_WAITING".
    #[serde(rename = "type")]
    pub kind: String,
}

/// One stored partition as reported by sw_status.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
    pub bytes: i64,
    /// Whether the partition belongs to the running generation.
    pub current: bool,
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStatusOutput {
    #[serde(flatten)]
    pub worker: WorkerStatus,
    pub partitions: Vec<PartitionSummary>,
}

pub async fn install_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let status = worker.install().await?;
    json_result(&status)
}

pub async fn activate_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let status = worker.activate().await?;
    json_result(&status)
}

pub async fn message_impl(worker: &WorkerHandle, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let status = worker.message(params.kind.trim()).await?;
    json_result(&status)
}

async fn partitions(worker: &WorkerHandle) -> Result<Vec<PartitionSummary>, Error> {
    let store = &worker.router().context().store;
    let generation = worker.router().generation();

    let mut names = store.keys().await?;
    names.sort();

    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        let entries = store.entries(&name).await?;
        summaries.push(PartitionSummary {
            entries: entries.len(),
            bytes: entries.iter().map(|e| e.body_len).sum(),
            current: generation.owns(&name),
            name,
        });
    }
    Ok(summaries)
}

pub async fn status_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput { worker: worker.status(), partitions: partitions(worker).await? };
    json_result(&output)
}
