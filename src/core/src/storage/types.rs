use chrono::{DateTime, FixedOffset, Utc};

/// One pinned item as reported by the remote, timestamps still in UTC.
///
/// An item without text carries an empty string, never a missing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub remote_id: i64,
    pub text: String,
    pub pinned_at: DateTime<Utc>,
    pub attachment: Option<Vec<u8>>,
}

impl RemoteItem {
    /// Normalize to the configured display offset for persistence.
    ///
    /// The conversion happens exactly once, here; everything downstream of
    /// the fetch (store rows, policy thresholds, alert bodies) works in the
    /// display offset.
    pub fn localize(&self, offset: FixedOffset) -> PinRecord {
        PinRecord {
            remote_id: self.remote_id,
            text: self.text.clone(),
            pinned_at: self.pinned_at.with_timezone(&offset),
            attachment: self.attachment.clone(),
        }
    }
}

/// A pinned item normalized for insertion; the store assigns `sequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    pub remote_id: i64,
    pub text: String,
    pub pinned_at: DateTime<FixedOffset>,
    pub attachment: Option<Vec<u8>>,
}

/// A stored pinned item.
///
/// `sequence` is assigned at first insertion, stable thereafter, and used
/// only for ordering; identity is `remote_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedItem {
    pub sequence: i64,
    pub remote_id: i64,
    pub text: String,
    pub pinned_at: DateTime<FixedOffset>,
    pub attachment: Option<Vec<u8>>,
}
