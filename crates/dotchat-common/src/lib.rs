//! # dotchat-common
//!
//! Shared components for the dotchat chat service.
//!
//! This crate contains:
//! - The self-describing binary wire format and its codec
//! - Request/response envelope types with validation
//! - TLS configuration helpers
//! - The blocking transport contract
//! - Clock helpers and the central error type
//!
//! ## Architecture
//!
//! The common crate is designed to be minimal and stable: both the server
//! and the client speak exclusively through the types defined here, so any
//! wire-level change only ever happens in one place.

pub mod bytestream;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod proto;
pub mod transport;

// Re-export commonly used items at crate root
pub use bytestream::ByteStream;
pub use error::{ChatError, Result};
pub use proto::{Message, Tag, Value, ValueList, ValueMap};
pub use transport::Transport;
