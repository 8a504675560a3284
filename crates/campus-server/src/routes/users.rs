use axum::{extract::State, Json};
use serde::Deserialize;

use campus_store::{ProfileUpsert, TrustEvent, User};

use crate::api::AppState;
use crate::error::{ApiError, StoreResultExt};
use crate::extract::{require, Validate, ValidJson, ValidQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UidQuery {
    pub uid: String,
}

impl Validate for UidQuery {
    fn validate(&self) -> Result<(), ApiError> {
        require("uid", &self.uid)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("uid", &self.uid)?;
        if let Some(name) = &self.display_name {
            require("displayName", name)?;
        }
        Ok(())
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<UidQuery>,
) -> Result<Json<User>, ApiError> {
    let user = state.db.get_user(&query.uid).or_not_found("User")?;
    Ok(Json(user))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.list_users()?))
}

pub async fn update_user(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .update_profile(&ProfileUpsert {
            uid: req.uid,
            email: None,
            display_name: req.display_name,
            photo_url: req.photo_url,
        })
        .or_not_found("User")?;
    Ok(Json(user))
}

pub async fn trust_history(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<UidQuery>,
) -> Result<Json<Vec<TrustEvent>>, ApiError> {
    Ok(Json(state.db.trust_history(&query.uid)?))
}
