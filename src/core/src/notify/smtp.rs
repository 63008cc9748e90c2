use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::Notifier;
use crate::error::DispatchError;
use crate::render::RenderedAlert;

/// SMTP notifier: sends each alert as a multipart/alternative email
/// (plain text + HTML) from the configured address to itself, over an
/// implicit-TLS relay.
pub struct SmtpNotifier {
    mailbox: Mailbox,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(
        address: &str,
        password: &str,
        host: &str,
        port: u16,
    ) -> Result<Self, DispatchError> {
        let mailbox: Mailbox = address.parse()?;
        let credentials = Credentials::new(mailbox.email.to_string(), password.to_string());
        let transport = SmtpTransport::relay(host)?
            .port(port)
            .credentials(credentials)
            .build();
        Ok(Self { mailbox, transport })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, alert: &RenderedAlert) -> Result<(), DispatchError> {
        let message = Message::builder()
            .from(self.mailbox.clone())
            .to(self.mailbox.clone())
            .subject(alert.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                alert.plain_text_body.clone(),
                alert.html_body.clone(),
            ))?;
        self.transport.send(&message)?;
        Ok(())
    }
}
