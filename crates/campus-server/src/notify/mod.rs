//! Outgoing email: sender backends, templates and the outbox dispatcher.

pub mod console;
pub mod dispatcher;
pub mod email_api;
pub mod routing;
pub mod smtp;
pub mod templates;

use thiserror::Error;

pub use console::ConsoleEmailSender;
pub use dispatcher::{DrainReport, Dispatcher};
pub use email_api::ApiEmailSender;
pub use routing::RoutingEmailSender;
pub use smtp::SmtpEmailSender;

/// What an email is about. Routing picks a backend per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailCategory {
    Otp,
    Proposal,
    Reminder,
    Confirmation,
}

/// A rendered email ready for any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub category: EmailCategory,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// The `From:` mailbox shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromAddress {
    pub email: String,
    pub name: String,
}

impl FromAddress {
    pub fn mailbox(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("email API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery task failed: {0}")]
    Task(String),
}

/// Blocking email backend. The dispatcher calls it from the blocking pool.
pub trait EmailSender: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError>;
}
