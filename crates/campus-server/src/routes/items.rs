use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use campus_shared::ListingType;
use campus_store::{Item, ItemFilter, ItemUpdate, NewItem};

use crate::api::AppState;
use crate::error::{ApiError, StoreResultExt};
use crate::extract::{require, Validate, ValidJson, ValidQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateItemRequest {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "available_by_default")]
    pub available: bool,
    pub listing_type: ListingType,
    pub category: String,
}

fn available_by_default() -> bool {
    true
}

fn check_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::Validation("price must be a non-negative number".into()));
    }
    Ok(())
}

impl Validate for CreateItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("ownerId", &self.owner_id)?;
        require("title", &self.title)?;
        require("category", &self.category)?;
        check_price(self.price)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemIdQuery {
    pub item_id: Uuid,
}

impl Validate for ItemIdQuery {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateItemRequest {
    pub item_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub category: Option<String>,
}

impl UpdateItemRequest {
    fn changes(&self) -> ItemUpdate {
        ItemUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
            available: self.available,
            listing_type: self.listing_type,
            category: self.category.clone(),
        }
    }
}

impl Validate for UpdateItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.changes().is_empty() {
            return Err(ApiError::Validation("no fields to update".into()));
        }
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(category) = &self.category {
            require("category", category)?;
        }
        match self.price {
            Some(price) => check_price(price),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListItemsQuery {
    pub owner_id: Option<String>,
    pub category: Option<String>,
    pub listing_type: Option<ListingType>,
    pub available: Option<bool>,
}

impl Validate for ListItemsQuery {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

pub async fn create_item(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let item = state.db.create_item(
        &NewItem {
            owner_id: req.owner_id,
            title: req.title.trim().to_string(),
            description: req.description,
            price: req.price,
            image_url: req.image_url,
            available: req.available,
            listing_type: req.listing_type,
            category: req.category,
        },
        state.clock.now(),
    )?;
    tracing::info!(item = %item.id, owner = %item.owner_id, "item listed");
    Ok(Json(item))
}

pub async fn get_item(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ItemIdQuery>,
) -> Result<Json<Item>, ApiError> {
    Ok(Json(state.db.get_item(query.item_id).or_not_found("Item")?))
}

pub async fn update_item(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<UpdateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .db
        .update_item(req.item_id, &req.changes())
        .or_not_found("Item")?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ItemIdQuery>,
) -> Result<Json<Item>, ApiError> {
    let item = state.db.delete_item(query.item_id).or_not_found("Item")?;
    tracing::info!(item = %item.id, "item deleted");
    Ok(Json(item))
}

pub async fn list_items(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListItemsQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.db.list_items(&ItemFilter {
        owner_id: query.owner_id,
        category: query.category,
        listing_type: query.listing_type,
        available: query.available,
    })?;
    Ok(Json(items))
}
