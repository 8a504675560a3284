use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::database::{not_found, parse_enum, parse_timestamp, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::items::get_item_in;
use crate::models::WishlistEntry;

impl Database {
    /// Save a snapshot of an item to the user's wishlist.
    ///
    /// Adding the same item again refreshes the snapshot but keeps the
    /// original creation time.
    pub fn add_to_wishlist(&self, uid: &str, item_id: Uuid, now: DateTime<Utc>) -> Result<WishlistEntry> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let item = get_item_in(&tx, item_id)?;
        tx.execute(
            "INSERT INTO wishlist (uid, item_id, title, price, image_url, listing_type, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uid, item_id) DO UPDATE SET
                title        = excluded.title,
                price        = excluded.price,
                image_url    = excluded.image_url,
                listing_type = excluded.listing_type,
                category     = excluded.category",
            params![
                uid,
                item.id.to_string(),
                item.title,
                item.price,
                item.image_url,
                item.listing_type.as_str(),
                item.category,
                now.to_rfc3339(),
            ],
        )?;
        let entry = get_entry_in(&tx, uid, item_id)?;
        tx.commit()?;
        Ok(entry)
    }

    pub fn remove_from_wishlist(&self, uid: &str, item_id: Uuid) -> Result<()> {
        let affected = self.conn()?.execute(
            "DELETE FROM wishlist WHERE uid = ?1 AND item_id = ?2",
            params![uid, item_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// The user's wishlist, most recently added first.
    pub fn get_wishlist(&self, uid: &str) -> Result<Vec<WishlistEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT uid, item_id, title, price, image_url, listing_type, category, created_at
             FROM wishlist WHERE uid = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![uid], row_to_entry)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn get_entry_in(conn: &Connection, uid: &str, item_id: Uuid) -> Result<WishlistEntry> {
    conn.query_row(
        "SELECT uid, item_id, title, price, image_url, listing_type, category, created_at
         FROM wishlist WHERE uid = ?1 AND item_id = ?2",
        params![uid, item_id.to_string()],
        row_to_entry,
    )
    .map_err(not_found)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<WishlistEntry> {
    let item_str: String = row.get(1)?;
    let listing_str: String = row.get(5)?;
    let created_str: String = row.get(7)?;

    Ok(WishlistEntry {
        uid: row.get(0)?,
        item_id: parse_uuid(1, &item_str)?,
        title: row.get(2)?,
        price: row.get(3)?,
        image_url: row.get(4)?,
        listing_type: parse_enum(5, &listing_str)?,
        category: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemUpdate, NewItem};
    use campus_shared::ListingType;

    fn listed(db: &Database, title: &str) -> Uuid {
        db.create_item(
            &NewItem {
                owner_id: "owner".into(),
                title: title.into(),
                description: String::new(),
                price: 10.0,
                image_url: Some("img/1.png".into()),
                available: true,
                listing_type: ListingType::Share,
                category: "tools".into(),
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    #[test]
    fn add_then_fetch_contains_item() {
        let db = Database::open_in_memory().unwrap();
        let item = listed(&db, "Drill");

        db.add_to_wishlist("u1", item, Utc::now()).unwrap();
        let list = db.get_wishlist("u1").unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].item_id, item);
        assert_eq!(list[0].title, "Drill");
        assert!(db.get_wishlist("u2").unwrap().is_empty());
    }

    #[test]
    fn re_adding_refreshes_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let item = listed(&db, "Drill");
        let first = db.add_to_wishlist("u1", item, Utc::now()).unwrap();

        db.update_item(
            item,
            &ItemUpdate {
                price: Some(12.5),
                ..Default::default()
            },
        )
        .unwrap();
        let second = db.add_to_wishlist("u1", item, Utc::now()).unwrap();

        assert_eq!(second.price, 12.5);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(db.get_wishlist("u1").unwrap().len(), 1);
    }

    #[test]
    fn missing_item_or_entry_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.add_to_wishlist("u1", Uuid::new_v4(), Utc::now()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.remove_from_wishlist("u1", Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
