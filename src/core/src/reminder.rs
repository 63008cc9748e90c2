use crate::error::StoreError;
use crate::storage::{PinnedItem, Store};

/// Select up to `limit` random items for a reminder alert.
///
/// Reminders are independent of newness — they are a periodic "these are
/// still pinned" nudge. A non-positive limit yields an empty sample rather
/// than an error, so a disabled or zeroed reminder never aborts the cycle.
pub fn sample_reminders(store: &dyn Store, limit: i64) -> Result<Vec<PinnedItem>, StoreError> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    store.sample(limit as usize)
}
