//! Core types and shared functionality for fixie-sw.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - HTTP request/response descriptors
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore, Generation};
pub use config::AppConfig;
pub use error::Error;
pub use http::{CachedResponse, FetchRequest};
