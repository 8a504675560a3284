//! Email one-time-password issue and verification.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use campus_shared::constants::{OTP_DIGITS, OTP_TTL_SECS};
use campus_store::{Database, OtpRecord};

use crate::error::ApiError;

/// Uniformly random zero-padded code of `OTP_DIGITS` digits.
pub fn generate_code() -> String {
    let upper = 10u32.pow(OTP_DIGITS);
    let n = rand::thread_rng().gen_range(0..upper);
    format!("{:0width$}", n, width = OTP_DIGITS as usize)
}

/// Trim and lowercase an address, rejecting anything that is clearly not one.
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_ascii_lowercase();
    let plausible = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !plausible {
        return Err(ApiError::Validation(format!("invalid email address: {}", raw.trim())));
    }
    Ok(email)
}

/// Enforce the signup domain, when one is configured.
pub fn check_domain(email: &str, allowed: Option<&str>) -> Result<(), ApiError> {
    match allowed {
        Some(domain) if !email.ends_with(&format!("@{domain}")) => {
            Err(ApiError::DomainNotAllowed(domain.to_string()))
        }
        _ => Ok(()),
    }
}

/// Store a fresh code for `email` and queue the email carrying it.
pub fn issue(db: &Database, email: &str, now: DateTime<Utc>) -> Result<OtpRecord, ApiError> {
    let record = OtpRecord {
        email: email.to_string(),
        code: generate_code(),
        created_at: now,
        expires_at: now + Duration::seconds(OTP_TTL_SECS),
        verified: false,
    };
    db.store_otp(&record)?;
    tracing::info!(email = %email, expires_at = %record.expires_at, "OTP issued");
    Ok(record)
}

/// Check a submitted code. Order: missing, already verified, expired, mismatch.
pub fn verify(db: &Database, email: &str, code: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
    let record = db
        .get_otp(email)?
        .ok_or_else(|| ApiError::NotFound("OTP".to_string()))?;

    if record.verified {
        return Err(ApiError::AlreadyDone("OTP already verified".to_string()));
    }
    if now > record.expires_at {
        return Err(ApiError::Expired);
    }
    if record.code != code.trim() {
        return Err(ApiError::InvalidCode);
    }

    // A concurrent verify may have won between the read and this update.
    if !db.mark_otp_verified(email, &record.code)? {
        return Err(ApiError::AlreadyDone("OTP already verified".to_string()));
    }

    tracing::info!(email = %email, "OTP verified");
    Ok(())
}
