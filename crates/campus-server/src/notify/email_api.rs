//! Sender for an HTTP transactional-email API (SendGrid v3 style payload).

use std::time::Duration;

use serde_json::json;

use super::{DeliveryError, EmailSender, FromAddress, OutgoingEmail};
use crate::config::EmailApiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ApiEmailSender {
    api_url: String,
    api_key: String,
    from: FromAddress,
}

impl ApiEmailSender {
    pub fn new(config: &EmailApiConfig, from: FromAddress) -> Self {
        Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from,
        }
    }

    fn payload(&self, email: &OutgoingEmail) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from.email, "name": self.from.name },
            "subject": email.subject,
            "content": [
                { "type": "text/plain", "value": email.text },
                { "type": "text/html", "value": email.html },
            ],
        })
    }
}

impl EmailSender for ApiEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        // The blocking client owns a runtime of its own, so it is built and
        // dropped here on the blocking pool rather than held in async state.
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let response = client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %email.to, category = ?email.category, "Email accepted by API");
        Ok(())
    }
}
