//! sw_fetch tool implementation.
//!
//! Replays one intercepted page request through the worker and reports
//! how it was answered.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use fixie_client::fetch::canonicalize;
use fixie_client::{Provenance, RequestClass};
use fixie_core::FetchRequest;

use crate::error::ToolError;
use crate::tools::json_result;
use crate::worker::WorkerHandle;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL as the page would request it; relative URLs resolve against the app base.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Whether this is a top-level page load.
    #[serde(default)]
    pub navigate: bool,

    /// Include the response body as text (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub provenance: Provenance,
    /// Absent when the worker did not route the request.
    pub class: Option<RequestClass>,
    pub controlled: bool,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub body: Option<String>,
}

fn request(base: &Url, params: &SwFetchParams) -> Result<FetchRequest, ToolError> {
    let method = params.method.trim().to_ascii_uppercase();
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {:?}", params.method)));
    }
    let url = canonicalize(&params.url, base)?;
    Ok(FetchRequest { method, url, navigate: params.navigate })
}

pub async fn fetch_impl(worker: &WorkerHandle, base: &Url, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = request(base, &params)?;
    let routed = worker.fetch(request).await?;
    let response = routed.fetched.response;

    let output = SwFetchOutput {
        content_type: response.content_type().map(str::to_string),
        body: params
            .include_body
            .then(|| String::from_utf8_lossy(&response.body).into_owned()),
        body_len: response.body.len(),
        url: response.url,
        status: response.status,
        provenance: routed.fetched.provenance,
        class: routed.class,
        controlled: routed.controlled,
        headers: response.headers,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::decode;
    use crate::worker::testing::{config, setup};
    use serde_json::Value;

    fn base() -> Url {
        Url::parse("https://fixie.run/").unwrap()
    }

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), navigate: false, include_body: true }
    }

    #[test]
    fn test_request_resolves_relative_url() {
        let request = request(&base(), &SwFetchParams { method: "post".into(), ..params("./api/rides") }).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url.as_str(), "https://fixie.run/api/rides");
    }

    #[test]
    fn test_request_rejects_bad_input() {
        assert!(matches!(request(&base(), &params("  ")), Err(ToolError::InvalidUrl(_))));
        assert!(matches!(
            request(&base(), &SwFetchParams { method: "G T".into(), ..params("/") }),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_after_install_reports_cache_hit() {
        let (worker, network, _db) = setup(&config()).await;
        worker.install().await.unwrap();
        network.set_offline(true);

        let result = fetch_impl(&worker, &base(), params("./style.css")).await.unwrap();
        let output: Value = decode(&result);

        assert_eq!(output["provenance"], "from-cache");
        assert_eq!(output["class"], "static-asset");
        assert_eq!(output["controlled"], true);
        assert_eq!(output["body"], "shell");
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_document() {
        let (worker, network, _db) = setup(&config()).await;
        worker.install().await.unwrap();
        network.set_offline(true);

        let nav = SwFetchParams { navigate: true, include_body: false, ..params("/rides/42") };
        let output: Value = decode(&fetch_impl(&worker, &base(), nav).await.unwrap());

        assert_eq!(output["status"], 200);
        assert_eq!(output["url"], "https://fixie.run/offline.html");
        assert!(output["body"].is_null());
    }

    #[tokio::test]
    async fn test_subresource_failure_is_error() {
        let (worker, network, _db) = setup(&config()).await;
        worker.install().await.unwrap();
        network.set_offline(true);

        let err = fetch_impl(&worker, &base(), params("/api/rides")).await.unwrap_err();
        assert_eq!(err.code.0, -32013);
    }
}
