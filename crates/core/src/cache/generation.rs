//! Generational partition naming.

use serde::Serialize;

/// The set of partition names belonging to one deployed version.
///
/// Names are `{prefix}-{kind}-{version}`. Partitions are never rewritten
/// across versions: a deploy bumps the version and the previous
/// generation is deleted once the new one activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct Generation {
    pub prefix: String,
    pub version: String,
}

impl Generation {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { prefix: prefix.to_string(), version: version.to_string() }
    }

    fn name(&self, kind: &str) -> String {
        format!("{}-{}-{}", self.prefix, kind, self.version)
    }

    /// App shell assets and the offline document.
    pub fn static_partition(&self) -> String {
        self.name("static")
    }

    /// Third-party CDN assets.
    pub fn cdn_partition(&self) -> String {
        self.name("cdn")
    }

    /// Map tiles.
    pub fn tiles_partition(&self) -> String {
        self.name("tiles")
    }

    /// Every partition of this generation; the allow-list used at activation.
    pub fn partition_names(&self) -> Vec<String> {
        vec![self.static_partition(), self.cdn_partition(), self.tiles_partition()]
    }

    pub fn owns(&self, partition: &str) -> bool {
        self.partition_names().iter().any(|p| p == partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names() {
        let generation = Generation::new("app", "v1.2.0");
        assert_eq!(generation.static_partition(), "app-static-v1.2.0");
        assert_eq!(generation.cdn_partition(), "app-cdn-v1.2.0");
        assert_eq!(generation.tiles_partition(), "app-tiles-v1.2.0");
        assert_eq!(generation.partition_names().len(), 3);
    }

    #[test]
    fn test_owns_only_same_version() {
        let v2 = Generation::new("app", "v2");
        assert!(v2.owns("app-static-v2"));
        assert!(!v2.owns("app-static-v1"));
        assert!(!v2.owns("other-static-v2"));
    }
}
