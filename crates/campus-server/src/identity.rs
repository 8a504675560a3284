//! Bridge from the identity provider's account-created event to a profile.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use campus_store::{Database, ProfileUpsert, StoreError, User};

/// Payload the identity provider posts when an account is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreated {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Create the profile, or merge non-null fields into an existing one.
pub fn on_account_created(
    db: &Database,
    event: &AccountCreated,
    now: DateTime<Utc>,
) -> Result<User, StoreError> {
    let user = db.upsert_profile(
        &ProfileUpsert {
            uid: event.uid.clone(),
            email: event.email.clone(),
            display_name: event.display_name.clone(),
            photo_url: event.photo_url.clone(),
        },
        now,
    )?;
    tracing::info!(uid = %user.uid, "profile synced from identity provider");
    Ok(user)
}
