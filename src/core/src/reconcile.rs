use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::error::StoreError;
use crate::storage::{PinRecord, Store};

/// Align the mirror with a freshly fetched snapshot.
///
/// Returns the pre-mutation watermark: the maximum `pinned_at` the store
/// held before this snapshot was applied. The watermark must be captured
/// before the prune and upsert — the last-update policy compares against
/// the previous cycle's state, and a post-mutation watermark would always
/// sit at or above every row, yielding an empty "new" set forever.
pub fn reconcile(
    store: &dyn Store,
    snapshot: &[PinRecord],
) -> Result<Option<DateTime<FixedOffset>>, StoreError> {
    let watermark = store.max_pinned_at()?;

    let keep_ids: HashSet<i64> = snapshot.iter().map(|item| item.remote_id).collect();
    store.prune(&keep_ids)?;
    store.upsert_many(snapshot)?;

    debug!(items = snapshot.len(), watermark = ?watermark, "snapshot reconciled");
    Ok(watermark)
}
