use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::AppState;
use crate::error::ApiError;
use crate::extract::{require, Validate, ValidJson};
use crate::otp::{check_domain, issue, normalize_email, verify};
use crate::routes::{ack, MessageResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendOtpRequest {
    pub email: String,
}

impl Validate for SendOtpRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("email", &self.email)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

impl Validate for VerifyOtpRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("email", &self.email)?;
        require("otp", &self.otp)
    }
}

pub async fn send_otp_email(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SendOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email)?;
    check_domain(&email, state.config.allowed_email_domain.as_deref())?;

    if !state.otp_limiter.check(email.clone()).await {
        tracing::warn!(email = %email, "OTP send throttled");
        return Err(ApiError::RateLimited);
    }

    issue(&state.db, &email, state.clock.now())?;
    state.dispatcher.wake();

    Ok(ack("OTP sent successfully"))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email)?;
    verify(&state.db, &email, &req.otp, state.clock.now())?;
    Ok(ack("OTP verified successfully"))
}
