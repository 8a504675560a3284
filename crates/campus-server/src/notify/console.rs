//! Development sender that writes emails to the log.

use super::{DeliveryError, EmailSender, OutgoingEmail};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        println!();
        println!("========================================");
        println!("  TO: {}", email.to);
        println!("  SUBJECT: {}", email.subject);
        println!("----------------------------------------");
        println!("{}", email.text);
        println!("========================================");
        println!();

        tracing::info!(
            to = %email.to,
            category = ?email.category,
            subject = %email.subject,
            "Email written to console"
        );

        Ok(())
    }
}
