use std::sync::Arc;

use super::{DeliveryError, EmailCategory, EmailSender, OutgoingEmail};

/// Sends verification codes through one backend and everything else through another.
#[derive(Clone)]
pub struct RoutingEmailSender {
    otp: Arc<dyn EmailSender>,
    transactional: Arc<dyn EmailSender>,
}

impl RoutingEmailSender {
    pub fn new(otp: Arc<dyn EmailSender>, transactional: Arc<dyn EmailSender>) -> Self {
        Self { otp, transactional }
    }
}

impl EmailSender for RoutingEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        match email.category {
            EmailCategory::Otp => self.otp.send(email),
            EmailCategory::Proposal | EmailCategory::Reminder | EmailCategory::Confirmation => {
                self.transactional.send(email)
            }
        }
    }
}
