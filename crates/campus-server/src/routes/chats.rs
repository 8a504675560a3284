use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use campus_shared::DeliveryStatus;
use campus_store::{Chat, ChatMessage};

use crate::api::AppState;
use crate::error::{ApiError, StoreResultExt};
use crate::extract::{require, Validate, ValidJson, ValidQuery};
use crate::routes::users::UidQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
}

impl Validate for SendMessageRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("senderId", &self.sender_id)?;
        require("receiverId", &self.receiver_id)?;
        require("text", &self.text)?;
        if self.sender_id == self.receiver_id {
            return Err(ApiError::Validation("cannot message yourself".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatIdQuery {
    pub chat_id: String,
}

impl Validate for ChatIdQuery {
    fn validate(&self) -> Result<(), ApiError> {
        require("chatId", &self.chat_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReceiptRequest {
    pub chat_id: String,
    pub uid: String,
}

impl Validate for ReceiptRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("chatId", &self.chat_id)?;
        require("uid", &self.uid)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub updated: usize,
}

pub async fn send_message(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SendMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let message =
        state
            .db
            .send_message(&req.sender_id, &req.receiver_id, &req.text, state.clock.now())?;
    Ok(Json(message))
}

pub async fn get_messages(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ChatIdQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.db.get_messages(&query.chat_id).or_not_found("Chat")?))
}

pub async fn get_chats(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<UidQuery>,
) -> Result<Json<Vec<Chat>>, ApiError> {
    Ok(Json(state.db.list_chats(&query.uid)?))
}

pub async fn mark_messages_delivered(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ReceiptRequest>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    acknowledge(&state, req, DeliveryStatus::Delivered)
}

pub async fn mark_messages_seen(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ReceiptRequest>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    acknowledge(&state, req, DeliveryStatus::Seen)
}

fn acknowledge(
    state: &AppState,
    req: ReceiptRequest,
    status: DeliveryStatus,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let updated = state
        .db
        .acknowledge_messages(&req.chat_id, &req.uid, status)
        .or_not_found("Chat")?;
    Ok(Json(ReceiptResponse { updated }))
}
