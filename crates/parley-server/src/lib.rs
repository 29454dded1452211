//! # parley-server
//!
//! Real-time WebSocket chat server.
//!
//! - [`websocket::connection`]: per-peer handle with a non-blocking `send`
//! - [`websocket::registry`]: concurrency-safe membership set and broadcast fan-out
//! - [`websocket::session`]: per-connection control loop
//! - [`websocket::heartbeat`]: ping/pong keepalive
//! - [`server`]: axum bootstrap, `/health` and `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::ChatServer;
