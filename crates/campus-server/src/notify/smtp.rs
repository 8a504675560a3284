//! SMTP sender for production, used for verification codes.

use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::{DeliveryError, EmailSender, FromAddress, OutgoingEmail};
use crate::config::SmtpConfig;

pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build a TLS relay transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig, from: &FromAddress) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| DeliveryError::Transport(format!("Failed to create SMTP transport: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        let from = from
            .mailbox()
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidAddress(format!("{}: {e}", from.email)))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP transport configured");

        Ok(Self { transport, from })
    }

    /// Probe the relay; used at startup to warn early about bad credentials.
    pub fn test_connection(&self) -> Result<bool, DeliveryError> {
        self.transport
            .test_connection()
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidAddress(format!("{}: {e}", email.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        self.transport
            .send(&message)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        tracing::info!(to = %email.to, category = ?email.category, "Email sent over SMTP");
        Ok(())
    }
}
