//! The two clocks of the protocol.
//!
//! Session expiry runs on a monotonic clock so wall-clock jumps never
//! revoke (or revive) live sessions. Message timestamps use the wall
//! clock, since they are shown to people.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Milliseconds on a strictly non-decreasing, process-local clock.
pub fn monotonic_now_ms() -> i64 {
    anchor().elapsed().as_millis() as i64
}

/// Milliseconds since the Unix epoch on the wall clock.
pub fn wall_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
