use chrono::{DateTime, Duration, FixedOffset};
use tracing::warn;

use crate::config::AlertsConfig;
use crate::error::{ConfigError, StoreError};
use crate::storage::{PinnedItem, Store};

/// How "new since the last cycle" is decided.
///
/// Exactly one policy is active per run; the two configuration switches
/// are mutually exclusive and resolved once, before any fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewItemPolicy {
    /// Items pinned within the trailing window, regardless of prior
    /// cycles. Self-contained; valid even on a store with no history.
    TimeWindow { window_minutes: u64 },
    /// Items pinned after the store's pre-reconciliation watermark.
    LastUpdate,
}

impl NewItemPolicy {
    /// Resolve the active policy from the configuration switches.
    ///
    /// `store_is_fresh` is true when the mirror did not exist before this
    /// run. The last-update policy has no baseline then, so the run is
    /// forced onto the time-window policy instead of silently reporting
    /// nothing.
    pub fn resolve(alerts: &AlertsConfig, store_is_fresh: bool) -> Result<Self, ConfigError> {
        match (alerts.new_by_time_window, alerts.new_by_last_update) {
            (true, true) => Err(ConfigError::PoliciesBothEnabled),
            (false, false) => Err(ConfigError::NoPolicyEnabled),
            (true, false) => Ok(Self::TimeWindow {
                window_minutes: alerts.new_time_window_minutes,
            }),
            (false, true) if store_is_fresh => {
                warn!("last-update policy needs an existing mirror; using the time window for this run");
                Ok(Self::TimeWindow {
                    window_minutes: alerts.new_time_window_minutes,
                })
            }
            (false, true) => Ok(Self::LastUpdate),
        }
    }

    /// Decide which stored items count as new this cycle.
    ///
    /// `watermark` is the reconciler's pre-mutation watermark; `now` must
    /// already be in the display offset the store rows were normalized to.
    pub fn evaluate(
        &self,
        store: &dyn Store,
        watermark: Option<DateTime<FixedOffset>>,
        now: DateTime<FixedOffset>,
    ) -> Result<PolicyDecision, StoreError> {
        match *self {
            Self::TimeWindow { window_minutes } => {
                let since = now - Duration::minutes(window_minutes as i64);
                let new_items = store.query_since(since)?;
                Ok(PolicyDecision {
                    new_items,
                    since: Some(since),
                })
            }
            Self::LastUpdate => match watermark {
                Some(mark) => {
                    let new_items = store.query_since(mark)?;
                    Ok(PolicyDecision {
                        new_items,
                        since: Some(mark),
                    })
                }
                None => Ok(PolicyDecision {
                    new_items: Vec::new(),
                    since: None,
                }),
            },
        }
    }
}

/// The outcome of one policy evaluation.
#[derive(Debug)]
pub struct PolicyDecision {
    pub new_items: Vec<PinnedItem>,
    /// The threshold the new set was computed against — window start or
    /// watermark. `None` only when the last-update policy ran without a
    /// baseline, in which case `new_items` is empty.
    pub since: Option<DateTime<FixedOffset>>,
}
