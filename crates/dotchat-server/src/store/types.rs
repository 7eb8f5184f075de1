//! Row types stored in the database.

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub pass: String,
}

/// A bearer token issued at login.
///
/// `valid_until` is in milliseconds on the process-local monotonic clock,
/// so wall-clock jumps never revoke or revive a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionKey {
    pub key: i32,
    pub user: i32,
    pub valid_until: i64,
}

/// A chat channel. The owner is always one of its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    pub desc: Option<String>,
}

/// One message in a channel. `at` is wall-clock milliseconds since the
/// epoch, kept at full width in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i32,
    pub sender: i32,
    pub channel: i32,
    pub content: String,
    pub at: i64,
    pub replies_to: Option<i32>,
}
