//! Error types for dotchat
//!
//! We use `thiserror` for structured error types that can be matched on,
//! and `anyhow` for error propagation in the binaries.

use thiserror::Error;

/// Central error type for dotchat operations
#[derive(Error, Debug)]
pub enum ChatError {
    // === Codec Errors ===
    #[error("Can't parse message (missing magic number)")]
    BadFraming,

    #[error("Can't parse message (incompatible version {major}.{minor})")]
    IncompatibleVersion { major: u8, minor: u8 },

    #[error("Can't parse message (input truncated)")]
    Truncated,

    #[error("Invalid wire tag 0x{0:02X}")]
    BadType(u8),

    #[error("Message too big: {0}")]
    MessageTooBig(String),

    // === Envelope / Dispatch Errors ===
    /// Always caught by the dispatcher and converted into an `err` response;
    /// the connection stays open.
    #[error("{0}")]
    Protocol(String),

    // === Store Errors ===
    #[error("Store error: {0}")]
    Store(String),

    // === Transport Errors ===
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// A protocol error whose message becomes the `reason` of an `err`
    /// response.
    pub fn protocol(reason: impl Into<String>) -> Self {
        ChatError::Protocol(reason.into())
    }

    /// Wrap a store failure. The wrapped text is logged server-side; clients
    /// only ever see a stable reason.
    pub fn store(err: impl std::fmt::Display) -> Self {
        ChatError::Store(err.to_string())
    }
}

/// Result type alias using ChatError
pub type Result<T> = std::result::Result<T, ChatError>;

impl From<rustls::Error> for ChatError {
    fn from(err: rustls::Error) -> Self {
        ChatError::Tls(err.to_string())
    }
}
