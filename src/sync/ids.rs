use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

/// Issues a millisecond timestamp token for a new record or queued operation.
///
/// Tokens are strictly increasing within the process: a second call in the
/// same millisecond gets the next integer instead of a duplicate.
pub fn next_id() -> String {
    let now = Utc::now().timestamp_millis();
    let issued = LAST_ISSUED
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(if now > last { now } else { last + 1 })
        })
        .map(|last| if now > last { now } else { last + 1 })
        .unwrap_or(now);
    issued.to_string()
}

/// Makes later tokens sort after `id`, so a token persisted by an earlier run
/// is never issued again.
pub(crate) fn observe(id: &str) {
    if let Ok(value) = id.parse::<i64>() {
        LAST_ISSUED.fetch_max(value, Ordering::SeqCst);
    }
}
