//! SQLite-backed partitioned response cache.
//!
//! This module provides the `CacheStore` capability the fetch strategies
//! consume, and a persistent implementation using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Named, versioned partitions with generational naming
//! - Request keys derived from SHA-256 of method and canonical URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod partitions;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{CachedResponse, FetchRequest};

pub use connection::CacheDb;
pub use generation::Generation;
pub use partitions::EntryMeta;

/// Key-value storage of HTTP responses grouped into named partitions.
///
/// Every operation is atomic per key, so concurrent strategies can share a
/// store without further locking.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Store `response` under the request's key, replacing any previous entry.
    ///
    /// The store keeps its own clone; the caller's response stays usable.
    async fn put(&self, partition: &str, request: &FetchRequest, response: &CachedResponse) -> Result<(), Error>;

    /// Store every entry or none of them.
    async fn put_all(&self, partition: &str, entries: &[(FetchRequest, CachedResponse)]) -> Result<(), Error>;

    /// Look up the stored response for the request's key.
    async fn match_request(&self, partition: &str, request: &FetchRequest) -> Result<Option<CachedResponse>, Error>;

    /// Names of every partition in the store.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete one partition and its entries. Returns whether it existed.
    async fn delete(&self, partition: &str) -> Result<bool, Error>;

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Returns the names that were deleted.
    async fn delete_except(&self, keep: &[String]) -> Result<Vec<String>, Error>;

    /// Metadata of the entries stored in one partition.
    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error>;
}
