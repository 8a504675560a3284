//! HTTP handlers, one module per collection.
//!
//! Every handler takes a typed, validated request record, performs one
//! store operation (or one store transaction) and answers with JSON.

pub mod chats;
pub mod hooks;
pub mod items;
pub mod notify;
pub mod otp;
pub mod rentals;
pub mod users;
pub mod wishlist;

use axum::Json;
use serde::Serialize;

/// `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn ack(message: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: message.into(),
    })
}
