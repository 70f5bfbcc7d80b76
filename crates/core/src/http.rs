//! Request and response descriptors exchanged between the page, the
//! strategies, and the partition store.

use bytes::Bytes;
use url::Url;

use crate::cache::hash::compute_request_key;

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: Url,
    /// Set for full page loads; these always receive the offline document
    /// instead of an error.
    pub navigate: bool,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, navigate: false }
    }

    pub fn navigation(url: Url) -> Self {
        Self { method: "GET".into(), url, navigate: true }
    }

    /// Partition key for this request.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }

    /// Only GET requests over http(s) are ever written to a partition.
    pub fn is_cacheable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") && matches!(self.url.scheme(), "http" | "https")
    }
}

/// A fully buffered response.
///
/// The body is held as [`Bytes`], so handing one copy to the partition
/// store and another to the caller is a reference-count bump rather than a
/// second read of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    /// Status in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Synthetic 503 returned when neither network nor cache can answer.
    pub fn offline(url: &Url, content_type: &str, body: &'static str) -> Self {
        Self {
            url: url.to_string(),
            status: 503,
            headers: vec![("content-type".into(), content_type.into())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cacheable_only_get_http() {
        assert!(FetchRequest::get(url("https://example.com/app.js")).is_cacheable());

        let post = FetchRequest { method: "POST".into(), ..FetchRequest::get(url("https://example.com/api")) };
        assert!(!post.is_cacheable());

        let ext = FetchRequest::get(url("chrome-extension://abcdef/script.js"));
        assert!(!ext.is_cacheable());
    }

    #[test]
    fn test_key_ignores_navigation_flag() {
        let a = FetchRequest::get(url("https://example.com/"));
        let b = FetchRequest::navigation(url("https://example.com/"));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_success_range() {
        let mut resp = CachedResponse::offline(&url("https://example.com"), "text/plain", "offline");
        assert!(!resp.is_success());
        resp.status = 200;
        assert!(resp.is_success());
        resp.status = 299;
        assert!(resp.is_success());
        resp.status = 304;
        assert!(!resp.is_success());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let resp = CachedResponse::offline(&url("https://example.com"), "text/html", "");
        assert_eq!(resp.header("Content-Type"), Some("text/html"));
        assert_eq!(resp.content_type(), Some("text/html"));
        assert_eq!(resp.header("etag"), None);
    }
}
