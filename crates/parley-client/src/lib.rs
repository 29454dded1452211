//! # parley-client
//!
//! Terminal chat client. One connection, two concurrent activities:
//!
//! - receive: prints every message pushed by the server
//! - send: forwards operator lines until the `exit` sentinel or end of input
//!
//! Whichever finishes first ends the session and cancels the other.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod input;

pub use client::{ChatConnection, ChatExit, connect, run_chat};
pub use errors::ClientError;
pub use input::spawn_stdin_reader;
