use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use pinwatch_core::{Config, Cycle, HttpFetcher, SmtpNotifier, SqliteStore};
use tracing::{error, info, warn};
use url::Url;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_filter())
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var("PINWATCH_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("pinwatch.toml"));

    match run(&config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "cycle aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    config.validate()?;

    if !config.alerts.alert_new && !config.alerts.alert_reminder {
        warn!("no alerts enabled; the mirror will be updated but nothing will be sent");
    }

    let endpoint: Url = config.remote.endpoint.parse()?;
    let store = SqliteStore::open(&config.database.path)?;
    let fresh = store.is_fresh();
    if fresh {
        info!(path = %config.database.path.display(), "creating new mirror database");
    }

    let fetcher = HttpFetcher::new(endpoint, config.remote.token.clone());
    let notifier = SmtpNotifier::new(
        &config.email.address,
        &config.email.password,
        &config.email.host,
        config.email.port,
    )?;

    let cycle = Cycle::new(
        config,
        Arc::new(store),
        fresh,
        Box::new(fetcher),
        Box::new(notifier),
    )?;
    let report = cycle.run().await?;

    info!(
        total = report.total_pinned,
        new = report.new_items,
        reminders = report.reminder_items,
        "cycle complete"
    );
    for failure in &report.dispatch_failures {
        warn!(kind = failure.kind.label(), error = %failure.error, "alert was not delivered");
    }

    Ok(())
}

fn tracing_filter() -> tracing_subscriber::EnvFilter {
    let explicit = env::var("PINWATCH_LOG").or_else(|_| env::var("RUST_LOG")).ok();
    if let Some(filter) = explicit {
        return tracing_subscriber::EnvFilter::new(filter);
    }
    if matches!(
        env::var("PINWATCH_DEBUG").as_deref(),
        Ok("1" | "true" | "TRUE" | "yes" | "YES")
    ) {
        return tracing_subscriber::EnvFilter::new("debug");
    }
    tracing_subscriber::EnvFilter::new("info")
}
