//! # parley-core
//!
//! Transport-neutral building blocks shared by the parley server and client.
//!
//! - [`message`]: peer labels and the outbound wire format `"[ip:port]: text"`
//! - [`frame`]: WebSocket frame classification and [`FrameReceiver`], the
//!   suspending `receive()` that latches a terminal closed signal
//! - [`liveness`]: last-activity tracking used by the server heartbeat
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod constants;
pub mod frame;
pub mod liveness;
pub mod logging;
pub mod message;

pub use frame::{CloseKind, Frame, FrameReceiver, IntoFrame};
pub use liveness::Liveness;
pub use message::{PeerLabel, format_outbound};
