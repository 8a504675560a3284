use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use subtle::ConstantTimeEq;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::extract::{Validate, ValidJson};
use crate::identity::{on_account_created, AccountCreated};

fn verify_hook_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ApiError> {
    let Some(ref expected) = config.hook_token else {
        return Err(ApiError::Forbidden(
            "Account hook is disabled (no HOOK_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ApiError::Forbidden("Invalid hook token".into()));
    }
    Ok(())
}

impl Validate for AccountCreated {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Account-created callback from the identity provider.
///
/// Store failures are logged and swallowed: account creation upstream must
/// never be blocked by this service.
pub async fn user_created(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(event): ValidJson<AccountCreated>,
) -> Result<StatusCode, ApiError> {
    verify_hook_token(&headers, &state.config)?;

    if event.uid.trim().is_empty() {
        tracing::error!("account hook called without a uid");
        return Ok(StatusCode::ACCEPTED);
    }

    if let Err(e) = on_account_created(&state.db, &event, state.clock.now()) {
        tracing::error!(uid = %event.uid, error = %e, "failed to sync profile from identity provider");
    }
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(token: Option<&str>) -> ServerConfig {
        ServerConfig {
            hook_token: token.map(Into::into),
            ..ServerConfig::default()
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn token_checks() {
        assert!(verify_hook_token(&bearer("s3cret"), &config(Some("s3cret"))).is_ok());
        assert!(verify_hook_token(&bearer("s3cre"), &config(Some("s3cret"))).is_err());
        assert!(verify_hook_token(&HeaderMap::new(), &config(Some("s3cret"))).is_err());
        assert!(matches!(
            verify_hook_token(&bearer("anything"), &config(None)),
            Err(ApiError::Forbidden(_))
        ));
    }
}
