//! Shared defaults.

/// Default host the server binds to.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port the server binds to.
pub const DEFAULT_PORT: u16 = 8765;

/// Operator input that ends a client session. Compared case-insensitively.
pub const EXIT_COMMAND: &str = "exit";

/// Default prompt printed by the client after each inbound message.
pub const DEFAULT_PROMPT: &str = "> ";

/// Default maximum inbound message size (1 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default capacity of a connection's outbound queue.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 1024;

/// Default interval between server pings, in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 20;

/// Default time without inbound traffic before a peer is dropped, in seconds.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 20;
