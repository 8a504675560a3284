//! CRUD operations for [`Item`] records.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::database::{not_found, parse_enum, parse_timestamp, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{Item, ItemFilter, ItemUpdate, NewItem};
use crate::users::{bump_counter, Counter};

const ITEM_COLUMNS: &str = "id, owner_id, title, description, price, image_url, available, \
                            listing_type, category, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// List a new item and bump the owner's listed-item counter.
    pub fn create_item(&self, new: &NewItem, now: DateTime<Utc>) -> Result<Item> {
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: new.owner_id.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            price: new.price,
            image_url: new.image_url.clone(),
            available: new.available,
            listing_type: new.listing_type,
            category: new.category.clone(),
            created_at: now,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO items (id, owner_id, title, description, price, image_url,
                                available, listing_type, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id.to_string(),
                item.owner_id,
                item.title,
                item.description,
                item.price,
                item.image_url,
                item.available,
                item.listing_type.as_str(),
                item.category,
                item.created_at.to_rfc3339(),
            ],
        )?;
        bump_counter(&tx, &item.owner_id, Counter::ListedItems, 1)?;
        tx.commit()?;

        Ok(item)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_item(&self, id: Uuid) -> Result<Item> {
        get_item_in(&*self.conn()?, id)
    }

    /// List items matching every supplied filter, newest first.
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(owner) = &filter.owner_id {
            values.push(Value::Text(owner.clone()));
            clauses.push(format!("owner_id = ?{}", values.len()));
        }
        if let Some(category) = &filter.category {
            values.push(Value::Text(category.clone()));
            clauses.push(format!("category = ?{}", values.len()));
        }
        if let Some(listing_type) = filter.listing_type {
            values.push(Value::Text(listing_type.as_str().to_string()));
            clauses.push(format!("listing_type = ?{}", values.len()));
        }
        if let Some(available) = filter.available {
            values.push(Value::Integer(i64::from(available)));
            clauses.push(format!("available = ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items {where_sql} ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), row_to_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update. Last writer wins.
    pub fn update_item(&self, id: Uuid, update: &ItemUpdate) -> Result<Item> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE items SET
                title        = COALESCE(?2, title),
                description  = COALESCE(?3, description),
                price        = COALESCE(?4, price),
                image_url    = COALESCE(?5, image_url),
                available    = COALESCE(?6, available),
                listing_type = COALESCE(?7, listing_type),
                category     = COALESCE(?8, category)
             WHERE id = ?1",
            params![
                id.to_string(),
                update.title,
                update.description,
                update.price,
                update.image_url,
                update.available,
                update.listing_type.map(|t| t.as_str()),
                update.category,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        get_item_in(&conn, id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an item. Rentals and wishlist snapshots referencing it stay.
    pub fn delete_item(&self, id: Uuid) -> Result<Item> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let item = get_item_in(&tx, id)?;
        tx.execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])?;
        bump_counter(&tx, &item.owner_id, Counter::ListedItems, -1)?;
        tx.commit()?;
        Ok(item)
    }
}

pub(crate) fn get_item_in(conn: &Connection, id: Uuid) -> Result<Item> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
        params![id.to_string()],
        row_to_item,
    )
    .map_err(not_found)
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let id_str: String = row.get(0)?;
    let listing_str: String = row.get(7)?;
    let created_str: String = row.get(9)?;

    Ok(Item {
        id: parse_uuid(0, &id_str)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        image_url: row.get(5)?,
        available: row.get(6)?,
        listing_type: parse_enum(7, &listing_str)?,
        category: row.get(8)?,
        created_at: parse_timestamp(9, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileUpsert;
    use campus_shared::ListingType;
    use chrono::Duration;

    fn new_item(owner: &str, title: &str, listing_type: ListingType) -> NewItem {
        NewItem {
            owner_id: owner.to_string(),
            title: title.to_string(),
            description: "Barely used".to_string(),
            price: 20.0,
            image_url: None,
            available: true,
            listing_type,
            category: "books".to_string(),
        }
    }

    #[test]
    fn create_bumps_listed_counter_and_delete_reverts() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile(
            &ProfileUpsert {
                uid: "owner".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let item = db
            .create_item(&new_item("owner", "Calculus", ListingType::Rent), Utc::now())
            .unwrap();
        assert_eq!(db.get_user("owner").unwrap().listed_items, 1);

        db.delete_item(item.id).unwrap();
        assert_eq!(db.get_user("owner").unwrap().listed_items, 0);
        assert!(matches!(db.get_item(item.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn list_filters_and_orders_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let t0 = Utc::now();
        db.create_item(&new_item("a", "Old", ListingType::Rent), t0).unwrap();
        db.create_item(&new_item("a", "New", ListingType::Rent), t0 + Duration::minutes(1))
            .unwrap();
        db.create_item(&new_item("b", "Shared", ListingType::Share), t0)
            .unwrap();

        let mine = db
            .list_items(&ItemFilter {
                owner_id: Some("a".into()),
                ..Default::default()
            })
            .unwrap();
        let titles: Vec<_> = mine.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old"]);

        let shared = db
            .list_items(&ItemFilter {
                listing_type: Some(ListingType::Share),
                available: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].owner_id, "b");

        assert_eq!(db.list_items(&ItemFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        let item = db
            .create_item(&new_item("a", "Cycle", ListingType::Rent), Utc::now())
            .unwrap();

        let updated = db
            .update_item(
                item.id,
                &ItemUpdate {
                    price: Some(35.5),
                    available: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.price, 35.5);
        assert!(!updated.available);
        assert_eq!(updated.title, "Cycle");

        let missing = db.update_item(Uuid::new_v4(), &ItemUpdate::default());
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }
}
