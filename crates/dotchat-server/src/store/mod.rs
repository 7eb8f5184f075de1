//! SQLite-backed store.
//!
//! All access goes through [`Store`]; each call acquires the connection
//! mutex for its whole duration, so concurrent handler calls are
//! serialized here. Failures surface as [`ChatError::Store`] and never
//! carry SQL out of this module.

mod types;

pub use types::{Channel, SessionKey, StoredMessage, User};

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use dotchat_common::error::{ChatError, Result};

/// Database file, created in the working directory on first run.
pub const DB_FILE: &str = "db.dotchat.sqlite";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user (
    id          INTEGER PRIMARY KEY,
    name        TEXT UNIQUE NOT NULL,
    pass        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS session_key (
    key         INTEGER PRIMARY KEY,
    user        INTEGER NOT NULL REFERENCES user(id),
    valid_until INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS channel (
    id          INTEGER PRIMARY KEY,
    name        TEXT UNIQUE NOT NULL,
    owner_id    INTEGER NOT NULL REFERENCES user(id),
    description TEXT
);
CREATE TABLE IF NOT EXISTS channel_member (
    user        INTEGER NOT NULL REFERENCES user(id),
    channel     INTEGER NOT NULL REFERENCES channel(id),
    PRIMARY KEY (user, channel)
);
CREATE TABLE IF NOT EXISTS message (
    id          INTEGER PRIMARY KEY,
    sender      INTEGER NOT NULL REFERENCES user(id),
    channel     INTEGER NOT NULL REFERENCES channel(id),
    content     TEXT NOT NULL,
    at          INTEGER NOT NULL,
    replies_to  INTEGER REFERENCES message(id)
);
CREATE INDEX IF NOT EXISTS idx_message_channel ON message(channel, at);
CREATE INDEX IF NOT EXISTS idx_session_key_user ON session_key(user);
";

/// Handle on the database. Cheap to share behind an `Arc`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path`. A freshly created database
    /// is seeded with the default user and channel. Session keys are
    /// dropped on every open: their validity is measured on the
    /// process-local monotonic clock, so they never survive a restart.
    pub fn open(path: &Path) -> Result<Self> {
        let fresh = !path.exists();
        let conn = Connection::open(path).map_err(ChatError::store)?;
        let store = Self::init(conn, fresh)?;
        if fresh {
            info!(path = %path.display(), "created and seeded database");
        }
        Ok(store)
    }

    /// A fresh, seeded in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(ChatError::store)?;
        Self::init(conn, true)
    }

    fn init(conn: Connection, fresh: bool) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(ChatError::store)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        if fresh {
            store.seed()?;
        }
        store.clear_session_keys()?;
        Ok(store)
    }

    fn seed(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "INSERT INTO user (id, name, pass) VALUES (1, 'master', 'pass');
             INSERT INTO channel (id, name, owner_id, description)
                 VALUES (1, 'general', 1, 'general main room');
             INSERT INTO channel_member (user, channel) VALUES (1, 1);",
        )
        .map_err(ChatError::store)
    }

    // === Users ===

    pub fn user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, pass FROM user WHERE name = ?1",
            params![name],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    pass: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(ChatError::store)
    }

    pub fn user_by_id(&self, id: i32) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, pass FROM user WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    pass: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(ChatError::store)
    }

    pub fn insert_user(&self, name: &str, pass: &str) -> Result<i32> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user (name, pass) VALUES (?1, ?2)",
            params![name, pass],
        )
        .map_err(ChatError::store)?;
        Ok(conn.last_insert_rowid() as i32)
    }

    pub fn update_password(&self, user: i32, pass: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE user SET pass = ?2 WHERE id = ?1",
            params![user, pass],
        )
        .map_err(ChatError::store)?;
        Ok(())
    }

    // === Session keys ===

    pub fn session_key(&self, key: i32) -> Result<Option<SessionKey>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT key, user, valid_until FROM session_key WHERE key = ?1",
            params![key],
            |row| {
                Ok(SessionKey {
                    key: row.get(0)?,
                    user: row.get(1)?,
                    valid_until: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(ChatError::store)
    }

    /// True when `key` exists and has not yet expired at `now`.
    pub fn session_key_live(&self, key: i32, now: i64) -> Result<bool> {
        Ok(matches!(self.session_key(key)?, Some(k) if k.valid_until >= now))
    }

    pub fn replace_session_key(&self, key: SessionKey) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO session_key (key, user, valid_until) VALUES (?1, ?2, ?3)",
            params![key.key, key.user, key.valid_until],
        )
        .map_err(ChatError::store)?;
        Ok(())
    }

    pub fn delete_session_keys_for(&self, user: i32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM session_key WHERE user = ?1", params![user])
            .map_err(ChatError::store)?;
        Ok(())
    }

    fn clear_session_keys(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM session_key", [])
            .map_err(ChatError::store)?;
        Ok(())
    }

    // === Channels ===

    pub fn channel_by_id(&self, id: i32) -> Result<Option<Channel>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, owner_id, description FROM channel WHERE id = ?1",
            params![id],
            |row| {
                Ok(Channel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    desc: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(ChatError::store)
    }

    pub fn channel_by_name(&self, name: &str) -> Result<Option<Channel>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, owner_id, description FROM channel WHERE name = ?1",
            params![name],
            |row| {
                Ok(Channel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    desc: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(ChatError::store)
    }

    /// Insert a channel and enroll its owner as a member, atomically.
    pub fn insert_channel(&self, name: &str, owner: i32, desc: Option<&str>) -> Result<i32> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(ChatError::store)?;
        tx.execute(
            "INSERT INTO channel (name, owner_id, description) VALUES (?1, ?2, ?3)",
            params![name, owner, desc],
        )
        .map_err(ChatError::store)?;
        let id = tx.last_insert_rowid() as i32;
        tx.execute(
            "INSERT INTO channel_member (user, channel) VALUES (?1, ?2)",
            params![owner, id],
        )
        .map_err(ChatError::store)?;
        tx.commit().map_err(ChatError::store)?;
        Ok(id)
    }

    /// `(id, name)` of every channel `user` is a member of.
    pub fn channels_for_user(&self, user: i32) -> Result<Vec<(i32, String)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT channel.id, channel.name FROM channel
                 JOIN channel_member ON channel_member.channel = channel.id
                 WHERE channel_member.user = ?1
                 ORDER BY channel.id",
            )
            .map_err(ChatError::store)?;
        let rows = stmt
            .query_map(params![user], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(ChatError::store)?;
        rows.collect::<rusqlite::Result<_>>().map_err(ChatError::store)
    }

    // === Membership ===

    pub fn members_of(&self, channel: i32) -> Result<Vec<i32>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT user FROM channel_member WHERE channel = ?1 ORDER BY user")
            .map_err(ChatError::store)?;
        let rows = stmt
            .query_map(params![channel], |row| row.get(0))
            .map_err(ChatError::store)?;
        rows.collect::<rusqlite::Result<_>>().map_err(ChatError::store)
    }

    pub fn is_member(&self, user: i32, channel: i32) -> Result<bool> {
        let conn = self.conn.lock();
        let hit: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM channel_member WHERE user = ?1 AND channel = ?2",
                params![user, channel],
                |row| row.get(0),
            )
            .optional()
            .map_err(ChatError::store)?;
        Ok(hit.is_some())
    }

    pub fn insert_member(&self, user: i32, channel: i32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO channel_member (user, channel) VALUES (?1, ?2)",
            params![user, channel],
        )
        .map_err(ChatError::store)?;
        Ok(())
    }

    /// Channels both `a` and `b` are members of.
    pub fn mutual_channels(&self, a: i32, b: i32) -> Result<Vec<i32>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT channel FROM channel_member
                 WHERE user = ?1 AND channel IN (
                     SELECT channel FROM channel_member WHERE user = ?2
                 )
                 ORDER BY channel",
            )
            .map_err(ChatError::store)?;
        let rows = stmt
            .query_map(params![a, b], |row| row.get(0))
            .map_err(ChatError::store)?;
        rows.collect::<rusqlite::Result<_>>().map_err(ChatError::store)
    }

    // === Messages ===

    pub fn insert_message(&self, sender: i32, channel: i32, content: &str, at: i64) -> Result<i32> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO message (sender, channel, content, at, replies_to)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![sender, channel, content, at],
        )
        .map_err(ChatError::store)?;
        Ok(conn.last_insert_rowid() as i32)
    }

    /// Messages in `channel`, ordered by send time ascending.
    pub fn messages_in(&self, channel: i32) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, sender, channel, content, at, replies_to FROM message
                 WHERE channel = ?1 ORDER BY at, id",
            )
            .map_err(ChatError::store)?;
        let rows = stmt
            .query_map(params![channel], |row| {
                Ok(StoredMessage {
                    id: row.get(0)?,
                    sender: row.get(1)?,
                    channel: row.get(2)?,
                    content: row.get(3)?,
                    at: row.get(4)?,
                    replies_to: row.get(5)?,
                })
            })
            .map_err(ChatError::store)?;
        rows.collect::<rusqlite::Result<_>>().map_err(ChatError::store)
    }
}
