//! Wire protocol definitions for dotchat
//!
//! ## Protocol Design Principles
//!
//! 1. **Self-describing**: every value carries a one-byte type tag, so a
//!    receiver can walk a message it has never seen before
//! 2. **Versioned**: every message leads with a magic number and a
//!    major/minor pair for compatibility gating
//! 3. **Self-delimiting**: after the command-length byte the format needs
//!    no outer framing; the codec knows when a message is complete
//!
//! ## Message Format
//!
//! ```text
//! message   := magic(2) version(2) command(string) map
//! magic     := 2E 43
//! version   := major(1) minor(1)
//! string    := len(1) bytes(len)         ; len <= 255
//! map       := count(1) entry{count}     ; count <= 255
//! entry     := string tag(1) value
//! value     := scalar | string | list | map
//! list      := elem_tag(1) count(4,BE) elem_body{count}
//! ```
//!
//! Multibyte integers are big-endian on the wire. Signed integers use
//! two's-complement with the same byte ordering as their unsigned
//! counterparts.
//!
//! ## Security
//!
//! This protocol MUST only be used over encrypted transports (TLS).
//! Authentication happens in-protocol via session tokens obtained from the
//! `login` command.

pub mod message;
pub mod requests;
pub mod responses;
pub mod value;
pub mod wire;

pub use message::Message;
pub use value::{Tag, Value, ValueList, ValueMap};

/// Magic number opening every message: `.C`
pub const MAGIC: [u8; 2] = [0x2E, 0x43];

/// Preferred protocol version (major, minor). Messages whose version pair
/// exceeds this one are rejected.
pub const PROTOCOL_MAJOR: u8 = 0x00;
pub const PROTOCOL_MINOR: u8 = 0x01;

/// Length-prefixed fields (command, keys, string values) top out at one
/// byte of length, and maps at one byte of entry count.
pub const MAX_SHORT_LEN: usize = 255;
