//! Hutch Client - pooled HTTP clients for broker management APIs
//!
//! This crate provides:
//! - `PooledClient`: a JSON client bound to one cluster's base URL and credentials
//! - `ClientPool`: the concurrent per-cluster cache with update and eviction
//! - Mapping of transport and HTTP failures onto `ProxyError`

pub mod config;
pub mod http;
pub mod pool;

pub use config::PoolConfig;
pub use http::PooledClient;
pub use pool::ClientPool;

// Callers issue verbs through `PooledClient::execute`
pub use reqwest::Method;
