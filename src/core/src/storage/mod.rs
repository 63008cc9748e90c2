mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::{PinRecord, PinnedItem, RemoteItem};

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::error::StoreError;

/// Abstract storage interface for the local mirror of the pinned
/// collection.
///
/// All methods use `&self` — implementations must handle interior
/// mutability (e.g. `Mutex<Connection>` for sqlite). Timestamps are
/// compared in their stored textual form, so every threshold handed to a
/// query must use the same UTC offset the rows were normalized to.
pub trait Store: Send + Sync + 'static {
    /// Insert items whose `remote_id` is not already present.
    ///
    /// Existing rows are left untouched even when the remote text or
    /// timestamp differs — the first captured version of an item wins.
    /// Calling with an empty list is a no-op.
    fn upsert_many(&self, items: &[PinRecord]) -> Result<(), StoreError>;

    /// Delete every row whose `remote_id` is not in `keep_ids`.
    ///
    /// An empty `keep_ids` deletes all rows: an empty remote snapshot
    /// means nothing is currently pinned.
    fn prune(&self, keep_ids: &HashSet<i64>) -> Result<(), StoreError>;

    /// Number of stored rows.
    fn count(&self) -> Result<u64, StoreError>;

    /// Maximum `pinned_at` across all rows, `None` when the store is empty.
    fn max_pinned_at(&self) -> Result<Option<DateTime<FixedOffset>>, StoreError>;

    /// Get one item by its remote identifier.
    fn get_by_id(&self, remote_id: i64) -> Result<Option<PinnedItem>, StoreError>;

    /// Rows with `pinned_at` strictly greater than `threshold`, ordered by
    /// `remote_id` ascending.
    fn query_since(&self, threshold: DateTime<FixedOffset>) -> Result<Vec<PinnedItem>, StoreError>;

    /// Rows with `sequence >= seq`. Oldest rows have the lowest sequence.
    fn query_since_sequence(&self, seq: i64) -> Result<Vec<PinnedItem>, StoreError>;

    /// Uniform random selection without replacement of up to `limit` rows.
    /// No ordering guarantee on the output.
    fn sample(&self, limit: usize) -> Result<Vec<PinnedItem>, StoreError>;

    /// Release the underlying resources. Safe to call twice; any other
    /// operation after `close` fails with [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError>;
}
