use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CycleError, DispatchError};
use crate::fetch::Fetcher;
use crate::notify::Notifier;
use crate::policy::NewItemPolicy;
use crate::reconcile::reconcile;
use crate::reminder::sample_reminders;
use crate::render::{render_alert, AlertKind, RenderContext};
use crate::storage::{PinnedItem, Store};

/// Phases of one cycle, in order. A cycle either reaches `Done` or aborts
/// in whatever phase failed; there is no mid-flight cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Reconciling,
    Deciding,
    Sampling,
    Dispatching,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::Deciding => "deciding",
            Self::Sampling => "sampling",
            Self::Dispatching => "dispatching",
            Self::Done => "done",
        }
    }
}

/// A per-alert-kind delivery failure, reported rather than fatal.
#[derive(Debug)]
pub struct DispatchFailure {
    pub kind: AlertKind,
    pub error: DispatchError,
}

/// Summary of one completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Size of the fetched snapshot (== store rows after reconciliation).
    pub total_pinned: usize,
    pub new_items: usize,
    pub reminder_items: usize,
    pub dispatch_failures: Vec<DispatchFailure>,
}

/// One observation cycle: fetch → reconcile → decide → sample → dispatch.
///
/// Construction resolves and validates the policy configuration, so a
/// misconfigured cycle fails before it ever touches the network. The
/// store must not be shared with a concurrent cycle; single-writer
/// discipline is the caller's responsibility.
pub struct Cycle {
    config: Config,
    offset: FixedOffset,
    policy: NewItemPolicy,
    store: Arc<dyn Store>,
    fetcher: Box<dyn Fetcher>,
    notifier: Box<dyn Notifier>,
}

impl Cycle {
    /// Build a cycle from already-constructed collaborators.
    ///
    /// `store_is_fresh` is whether the mirror existed before this process
    /// run (see `SqliteStore::is_fresh`); it drives the first-run policy
    /// fallback.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        store_is_fresh: bool,
        fetcher: Box<dyn Fetcher>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, CycleError> {
        config.validate()?;
        let offset = config.display_offset()?;
        let policy = NewItemPolicy::resolve(&config.alerts, store_is_fresh)?;
        Ok(Self {
            config,
            offset,
            policy,
            store,
            fetcher,
            notifier,
        })
    }

    /// Run the cycle to completion.
    ///
    /// The store is closed on the way out whether the cycle finished or
    /// aborted; an abort therefore never leaves a live handle behind.
    pub async fn run(&self) -> Result<CycleReport, CycleError> {
        let outcome = self.run_phases().await;
        if let Err(err) = self.store.close() {
            warn!(error = %err, "store close failed");
        }
        outcome
    }

    async fn run_phases(&self) -> Result<CycleReport, CycleError> {
        self.enter(Phase::Fetching);
        let snapshot = self.fetcher.fetch().await?;
        let total_pinned = snapshot.len();
        info!(total = total_pinned, "snapshot fetched");

        self.enter(Phase::Reconciling);
        let localized: Vec<_> = snapshot
            .iter()
            .map(|item| item.localize(self.offset))
            .collect();
        let watermark = reconcile(self.store.as_ref(), &localized)?;

        self.enter(Phase::Deciding);
        let now = Utc::now().with_timezone(&self.offset);
        let decision = self.policy.evaluate(self.store.as_ref(), watermark, now)?;

        self.enter(Phase::Sampling);
        let reminder_limit = if self.config.alerts.alert_reminder {
            self.config.alerts.reminder_limit
        } else {
            0
        };
        let reminders = sample_reminders(self.store.as_ref(), reminder_limit)?;

        self.enter(Phase::Dispatching);
        let mut report = CycleReport {
            total_pinned,
            new_items: decision.new_items.len(),
            reminder_items: reminders.len(),
            dispatch_failures: Vec::new(),
        };
        let ctx = RenderContext {
            time_format: &self.config.time.time_format,
            channel: self
                .config
                .alerts
                .include_channel
                .then_some(self.config.remote.channel.as_str()),
            now,
        };

        if self.config.alerts.alert_new && !decision.new_items.is_empty() {
            self.dispatch(
                AlertKind::New,
                &decision.new_items,
                total_pinned as u64,
                decision.since,
                &ctx,
                &mut report,
            );
        }
        if self.config.alerts.alert_reminder && !reminders.is_empty() {
            self.dispatch(
                AlertKind::Reminder,
                &reminders,
                total_pinned as u64,
                None,
                &ctx,
                &mut report,
            );
        }

        self.enter(Phase::Done);
        Ok(report)
    }

    fn dispatch(
        &self,
        kind: AlertKind,
        items: &[PinnedItem],
        total_pinned: u64,
        since: Option<DateTime<FixedOffset>>,
        ctx: &RenderContext<'_>,
        report: &mut CycleReport,
    ) {
        let alert = render_alert(kind, items, total_pinned, since, ctx);
        match self.notifier.send(&alert) {
            Ok(()) => info!(kind = kind.label(), count = items.len(), "alert dispatched"),
            Err(error) => {
                // Fire and continue: one failed alert kind must not block
                // the other, and the reconciliation stands either way.
                warn!(kind = kind.label(), error = %error, "alert dispatch failed");
                report.dispatch_failures.push(DispatchFailure { kind, error });
            }
        }
    }

    fn enter(&self, phase: Phase) {
        debug!(phase = phase.as_str(), "cycle phase");
    }
}
