//! URL canonicalization for request keys and routing.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL as the page would send it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`./app.js`, `/style.css`) against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base
        .join(trimmed)
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://fixie.run/app/").unwrap()
    }

    #[test]
    fn test_canonicalize_absolute() {
        let url = canonicalize("https://unpkg.com/leaflet@1.9.4/dist/leaflet.js", &base()).unwrap();
        assert_eq!(url.host_str(), Some("unpkg.com"));
        assert_eq!(url.path(), "/leaflet@1.9.4/dist/leaflet.js");
    }

    #[test]
    fn test_canonicalize_relative_to_base() {
        let url = canonicalize("./style.css", &base()).unwrap();
        assert_eq!(url.as_str(), "https://fixie.run/app/style.css");

        let root = canonicalize("/manifest.json", &base()).unwrap();
        assert_eq!(root.as_str(), "https://fixie.run/manifest.json");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://A.TILE.OpenStreetMap.org/1/2/3.png", &base()).unwrap();
        assert_eq!(url.host_str(), Some("a.tile.openstreetmap.org"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("./index.html#rides", &base()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/app/index.html");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("./app.js?v=2&b=1", &base()).unwrap();
        assert_eq!(url.query(), Some("v=2&b=1"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  https://example.com  ", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("chrome-extension://abcdef/content.js", &base());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &base()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &base()), Err(UrlError::Empty)));
    }
}
