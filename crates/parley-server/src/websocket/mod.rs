//! WebSocket connection management, heartbeat, session lifecycle and broadcasting.

pub mod connection;
pub mod heartbeat;
pub mod registry;
pub mod session;
