//! cache_get tool implementation.
//!
//! Looks up the stored response for a request without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use fixie_client::Router;
use fixie_client::fetch::canonicalize;
use fixie_core::{Error, FetchRequest};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL; relative URLs resolve against the app base.
    pub url: String,

    /// Partition to read. Defaults to the partition the router would use.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub key: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(router: &Router, base: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, base).map_err(ToolError::from)?;
    let request = FetchRequest::get(url);
    let partition = params
        .partition
        .unwrap_or_else(|| router.classify(&request.url).partition(router.generation()));

    let response = router
        .context()
        .store
        .match_request(&partition, &request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {partition}", request.url)))?;

    let output = CacheGetOutput {
        key: request.key(),
        body_len: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        url: response.url,
        status: response.status,
        headers: response.headers,
        partition,
    };
    json_result(&output)
}
