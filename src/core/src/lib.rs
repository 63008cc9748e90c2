mod config;
mod cycle;
mod error;
mod fetch;
mod notify;
mod policy;
mod reconcile;
mod reminder;
mod render;
mod storage;

pub use config::{
    AlertsConfig, Config, DatabaseConfig, EmailConfig, RemoteConfig, TimeConfig,
};
pub use cycle::{Cycle, CycleReport, DispatchFailure, Phase};
pub use error::{ConfigError, CycleError, DispatchError, FetchError, StoreError};
pub use fetch::{Fetcher, HttpFetcher};
pub use notify::{Notifier, SmtpNotifier};
pub use policy::{NewItemPolicy, PolicyDecision};
pub use reconcile::reconcile;
pub use reminder::sample_reminders;
pub use render::{render_alert, AlertKind, RenderContext, RenderedAlert};
pub use storage::{PinRecord, PinnedItem, RemoteItem, SqliteStore, Store};
