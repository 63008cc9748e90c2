mod smtp;

pub use smtp::SmtpNotifier;

use crate::error::DispatchError;
use crate::render::RenderedAlert;

/// Delivers one rendered alert.
///
/// A failure here is scoped to the alert being sent; the orchestrator
/// reports it and carries on with the other alert kind.
pub trait Notifier: Send + Sync {
    fn send(&self, alert: &RenderedAlert) -> Result<(), DispatchError>;
}
