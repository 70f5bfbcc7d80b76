//! cache_purge tool implementation.
//!
//! Deletes one named partition, or every partition outside the running
//! generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use fixie_client::Router;

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this partition.
    #[serde(default)]
    pub partition: Option<String>,

    /// Delete every partition that does not belong to the running generation.
    #[serde(default)]
    pub stale_only: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the partitions deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(router: &Router, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.partition.is_none() && !params.stale_only {
        return Err(ToolError::InvalidInput("one of partition or stale_only must be specified".to_string()).into());
    }

    let store = &router.context().store;
    let mut deleted = Vec::new();

    if let Some(partition) = params.partition
        && store.delete(&partition).await?
    {
        tracing::info!(partition = %partition, "purged partition");
        deleted.push(partition);
    }

    if params.stale_only {
        let stale = store.delete_except(&router.generation().partition_names()).await?;
        for partition in &stale {
            tracing::info!(partition = %partition, "purged stale partition");
        }
        deleted.extend(stale);
    }

    json_result(&CachePurgeOutput { deleted })
}
