//! Request key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the partition key for a request.
///
/// The URL fragment never reaches the network, so it is not part of the key.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", &url("https://example.com/app.js"));
        let hash2 = compute_request_key("GET", &url("https://example.com/app.js"));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        let upper = compute_request_key("GET", &url("https://example.com"));
        let lower = compute_request_key("get", &url("https://example.com"));
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_request_key("GET", &url("https://example.com"));
        let head = compute_request_key("HEAD", &url("https://example.com"));
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_ignores_fragment() {
        let plain = compute_request_key("GET", &url("https://example.com/index.html"));
        let frag = compute_request_key("GET", &url("https://example.com/index.html#stats"));
        assert_eq!(plain, frag);
    }

    #[test]
    fn test_hash_keeps_query() {
        let a = compute_request_key("GET", &url("https://example.com/?v=1"));
        let b = compute_request_key("GET", &url("https://example.com/?v=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", &url("https://example.com"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
