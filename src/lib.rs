//! Billboard - weekly cache of trending songs
//!
//! Fetches the trending chart, resolves every song to a downloadable URL,
//! keeps the result in an embedded database and serves it on `GET /billboard`.

/// Client modules for the remote APIs and local storage
pub mod clients;
/// Flags, environment and component wiring
pub mod config;
/// Fetch, resolve and persist pipeline
pub mod refresh;
/// Weekly trigger for refresh runs
pub mod scheduler;
/// HTTP read endpoint
pub mod server;
