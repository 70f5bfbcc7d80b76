//! Client code for fixie-sw.
//!
//! This crate provides the network capability, the request router, and the
//! cache strategies that answer intercepted fetches.

pub mod fetch;
pub mod precache;
pub mod router;
pub mod strategy;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use precache::{PrecacheReport, precache_all, precache_best_effort};
pub use router::{Classifier, RequestClass, Router};
pub use strategy::{Fetched, OfflineFallback, Provenance, Strategy, StrategyContext};
