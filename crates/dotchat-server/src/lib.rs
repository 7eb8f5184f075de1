//! # dotchat-server
//!
//! The server side of the dotchat chat service:
//! - SQLite-backed store for users, sessions, channels and messages
//! - Session guard validating bearer tokens
//! - Command dispatcher and handlers
//! - One connection worker thread per TLS session
//! - Connection manager with a background reaper
//! - Accept loop with cooperative SIGINT shutdown

pub mod dispatch;
pub mod handlers;
pub mod manager;
pub mod server;
pub mod session;
pub mod store;
pub mod worker;
