use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use campus_store::WishlistEntry;

use crate::api::AppState;
use crate::error::{ApiError, StoreResultExt};
use crate::extract::{require, Validate, ValidJson, ValidQuery};
use crate::routes::{ack, MessageResponse};

/// Body of `addToWishlist` and query of `removeFromWishlist`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WishlistKey {
    pub uid: String,
    pub item_id: Uuid,
}

impl Validate for WishlistKey {
    fn validate(&self) -> Result<(), ApiError> {
        require("uid", &self.uid)
    }
}

pub async fn add_to_wishlist(
    State(state): State<AppState>,
    ValidJson(key): ValidJson<WishlistKey>,
) -> Result<Json<WishlistEntry>, ApiError> {
    let entry = state
        .db
        .add_to_wishlist(&key.uid, key.item_id, state.clock.now())
        .or_not_found("Item")?;
    Ok(Json(entry))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    ValidQuery(key): ValidQuery<WishlistKey>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .db
        .remove_from_wishlist(&key.uid, key.item_id)
        .or_not_found("Wishlist entry")?;
    Ok(ack("Removed from wishlist"))
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<super::users::UidQuery>,
) -> Result<Json<Vec<WishlistEntry>>, ApiError> {
    Ok(Json(state.db.get_wishlist(&query.uid)?))
}
