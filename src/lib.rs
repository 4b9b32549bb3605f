//! Postable Broker Node Library
//!
//! Core modules of a task broker node. The binary (`main.rs`) wires them into
//! an HTTP server.
//!
//! ## Modules
//! - **`broadcast`**: Fan-out of one "start task" request to every configured
//!   peer cluster, merged back into a single NDJSON stream that ends exactly
//!   once, after every peer call has finished.
//! - **`config`**: Layered node configuration (defaults, TOML file,
//!   `POSTABLE_*` environment variables).
//! - **`server`**: Axum router, request-id / identity / basic-auth middleware
//!   and the service-up check.

pub mod broadcast;
pub mod config;
pub mod server;
