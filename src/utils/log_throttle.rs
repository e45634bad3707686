use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    suppressed: u64,
}

static WINDOWS: OnceLock<Mutex<HashMap<&'static str, Window>>> = OnceLock::new();

/// Returns `Some(suppressed_count)` when a log for `key` should be emitted,
/// otherwise `None` and the event is counted as suppressed for the active window.
///
/// Used on hot paths (one call per request) so a persistent failure logs
/// once per `interval` instead of once per request.
pub fn should_emit(key: &'static str, interval: Duration) -> Option<u64> {
    let windows = WINDOWS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut windows = match windows.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let now = Instant::now();

    let window = match windows.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(Window {
                opened_at: now,
                suppressed: 0,
            });
            return Some(0);
        }
        Entry::Occupied(slot) => slot.into_mut(),
    };
    if now.duration_since(window.opened_at) < interval {
        window.suppressed += 1;
        return None;
    }

    let suppressed = window.suppressed;
    window.opened_at = now;
    window.suppressed = 0;
    Some(suppressed)
}
