//! Session keys: issuing at login, validating on every authenticated
//! request.

use rand::RngCore;

use dotchat_common::clock;
use dotchat_common::error::{ChatError, Result};

use crate::store::{SessionKey, Store, User};

/// Sessions stay valid for 24 hours after login.
pub const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Resolve `token` to its owning user.
///
/// Fails with a protocol error when the token is unknown or expired on the
/// monotonic clock. Handlers never touch raw session state; they go
/// through here.
pub fn authenticate(store: &Store, token: i32) -> Result<User> {
    let now = clock::monotonic_now_ms();
    if let Some(key) = store.session_key(token)? {
        if key.valid_until >= now {
            return store.user_by_id(key.user)?.ok_or_else(|| {
                ChatError::store(format!("session key {token} references a missing user"))
            });
        }
    }
    Err(ChatError::protocol(format!(
        "Token '{token}' is invalid or has expired. Please log-in again."
    )))
}

/// Issue a fresh session key for `user` and persist it.
///
/// Keys are random 32-bit integers from `rng` (a CSPRNG in production).
/// Zero reads as "no token" on the client side and is never issued;
/// collisions with a live key are regenerated.
pub fn issue_token(store: &Store, user: i32, rng: &mut dyn RngCore) -> Result<i32> {
    loop {
        let candidate = rng.next_u32() as i32;
        if candidate == 0 {
            continue;
        }
        let now = clock::monotonic_now_ms();
        if store.session_key_live(candidate, now)? {
            continue;
        }
        store.replace_session_key(SessionKey {
            key: candidate,
            user,
            valid_until: now + SESSION_TTL_MS,
        })?;
        return Ok(candidate);
    }
}
