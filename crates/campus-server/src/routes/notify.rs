use axum::{extract::State, Json};
use serde::Deserialize;

use campus_store::{OutboxEvent, ProposalNotice};

use crate::api::AppState;
use crate::error::ApiError;
use crate::extract::{require, Validate, ValidJson};
use crate::routes::{ack, MessageResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProposalRequest {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub item_title: String,
    pub start_date: String,
    pub end_date: String,
    pub text: String,
    #[serde(default)]
    pub item_image: Option<String>,
    pub chat_id: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Validate for ProposalRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if present(&self.recipient_id).is_none() && present(&self.recipient_email).is_none() {
            return Err(ApiError::Validation(
                "recipientId or recipientEmail is required".into(),
            ));
        }
        require("senderId", &self.sender_id)?;
        require("senderName", &self.sender_name)?;
        require("itemTitle", &self.item_title)?;
        require("startDate", &self.start_date)?;
        require("endDate", &self.end_date)?;
        require("chatId", &self.chat_id)
    }
}

/// Queue a rental-proposal email to the item owner.
///
/// The address is resolved now so a recipient without one is reported to
/// the caller instead of failing silently in the dispatcher.
pub async fn notify_proposal_email(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ProposalRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let recipient_email = match present(&req.recipient_email) {
        Some(email) => email.to_string(),
        None => {
            let uid = present(&req.recipient_id).unwrap_or_default();
            state.db.user_email(uid)?.ok_or_else(|| {
                ApiError::Validation(format!("recipient {uid} has no email on file"))
            })?
        }
    };

    let notice = ProposalNotice {
        recipient_id: present(&req.recipient_id).map(str::to_string),
        recipient_email: Some(recipient_email),
        sender_id: req.sender_id,
        sender_name: req.sender_name,
        item_title: req.item_title,
        start_date: req.start_date,
        end_date: req.end_date,
        text: req.text,
        item_image: present(&req.item_image).map(str::to_string),
        chat_id: req.chat_id,
    };

    let id = state
        .db
        .enqueue(&OutboxEvent::RentalProposal(notice), state.clock.now())?;
    state.dispatcher.wake();

    tracing::info!(outbox_id = id, "proposal email queued");
    Ok(ack("Proposal email queued"))
}
