use thiserror::Error;

/// Configuration problems, detected before a cycle is allowed to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("new_by_time_window and new_by_last_update cannot both be enabled")]
    PoliciesBothEnabled,

    #[error("one of new_by_time_window or new_by_last_update must be enabled")]
    NoPolicyEnabled,

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure retrieving the remote snapshot.
///
/// Fatal for the current cycle; the core never retries internally. The next
/// scheduled cycle starts clean.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned status {0}")]
    Status(u16),

    #[error("decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Remote(String),
}

/// Failure reading or writing the persisted mirror.
///
/// Fatal for the current cycle: no alert may be dispatched from a store
/// that might be stale or partial.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store is closed")]
    Closed,

    #[error("store lock poisoned")]
    Poisoned,

    #[error("invalid stored timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Failure delivering one rendered alert.
///
/// Non-fatal and scoped to a single alert kind: the other kind still
/// dispatches, and the reconciliation that already completed stands.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid mailbox: {0}")]
    Mailbox(#[from] lettre::address::AddressError),

    #[error("compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("{0}")]
    Notifier(String),
}

/// Errors that abort a cycle. Dispatch failures are deliberately absent:
/// they are reported in the cycle report instead.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}
