//! Chats and their append-only message log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use campus_shared::{chat_id_for, DeliveryStatus};

use crate::database::{not_found, parse_enum, parse_opt_timestamp, parse_timestamp, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{Chat, ChatMessage};

const CHAT_COLUMNS: &str = "id, user_a, user_b, last_message, last_sender_id, last_message_at, \
                            unread_a, unread_b, created_at";

impl Database {
    /// Append a message, creating the chat on first contact.
    ///
    /// Updates the chat's last-message fields and the receiver's unread
    /// counter in the same transaction.
    pub fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage> {
        let chat_id = chat_id_for(sender_id, receiver_id);
        let (user_a, user_b) = if sender_id <= receiver_id {
            (sender_id, receiver_id)
        } else {
            (receiver_id, sender_id)
        };

        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id: chat_id.clone(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            text: text.to_string(),
            timestamp: now,
            status: DeliveryStatus::Sent,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO chats (id, user_a, user_b, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, user_a, user_b, now.to_rfc3339()],
        )?;
        let chat = get_chat_in(&tx, &chat_id)?;
        if chat.user_a != user_a || chat.user_b != user_b {
            return Err(StoreError::PreconditionFailed(format!(
                "chat {chat_id} belongs to other participants"
            )));
        }
        tx.execute(
            "INSERT INTO messages (id, chat_id, sender_id, receiver_id, text, timestamp, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id.to_string(),
                message.chat_id,
                message.sender_id,
                message.receiver_id,
                message.text,
                message.timestamp.to_rfc3339(),
                message.status.as_str(),
            ],
        )?;
        tx.execute(
            "UPDATE chats SET
                last_message    = ?2,
                last_sender_id  = ?3,
                last_message_at = ?4,
                unread_a        = unread_a + CASE WHEN user_a = ?5 THEN 1 ELSE 0 END,
                unread_b        = unread_b + CASE WHEN user_b = ?5 THEN 1 ELSE 0 END
             WHERE id = ?1",
            params![chat_id, text, sender_id, now.to_rfc3339(), receiver_id],
        )?;
        tx.commit()?;

        tracing::debug!(chat = %chat_id, message = %message.id, "message appended");
        Ok(message)
    }

    pub fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        get_chat_in(&*self.conn()?, chat_id)
    }

    /// Chats the user takes part in, most recently active first.
    pub fn list_chats(&self, uid: &str) -> Result<Vec<Chat>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats
             WHERE user_a = ?1 OR user_b = ?1
             ORDER BY COALESCE(last_message_at, created_at) DESC"
        ))?;
        let rows = stmt.query_map(params![uid], row_to_chat)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Full message log of a chat, oldest first.
    pub fn get_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;
        get_chat_in(&conn, chat_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, sender_id, receiver_id, text, timestamp, status
             FROM messages WHERE chat_id = ?1
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![chat_id], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Read receipt: raise the status of every message addressed to `uid`.
    ///
    /// Statuses only move forward (`sent` → `delivered` → `seen`). A `seen`
    /// receipt also clears the user's unread counter. Returns the number of
    /// messages changed.
    pub fn acknowledge_messages(
        &self,
        chat_id: &str,
        uid: &str,
        status: DeliveryStatus,
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let chat = get_chat_in(&tx, chat_id)?;
        if uid != chat.user_a && uid != chat.user_b {
            return Err(StoreError::PreconditionFailed(format!(
                "{uid} is not a participant of {chat_id}"
            )));
        }

        let changed = match status {
            DeliveryStatus::Sent => 0,
            DeliveryStatus::Delivered => tx.execute(
                "UPDATE messages SET status = 'delivered'
                 WHERE chat_id = ?1 AND receiver_id = ?2 AND status = 'sent'",
                params![chat_id, uid],
            )?,
            DeliveryStatus::Seen => {
                let changed = tx.execute(
                    "UPDATE messages SET status = 'seen'
                     WHERE chat_id = ?1 AND receiver_id = ?2 AND status != 'seen'",
                    params![chat_id, uid],
                )?;
                tx.execute(
                    "UPDATE chats SET
                        unread_a = CASE WHEN user_a = ?2 THEN 0 ELSE unread_a END,
                        unread_b = CASE WHEN user_b = ?2 THEN 0 ELSE unread_b END
                     WHERE id = ?1",
                    params![chat_id, uid],
                )?;
                changed
            }
        };
        tx.commit()?;
        Ok(changed)
    }
}

fn get_chat_in(conn: &Connection, chat_id: &str) -> Result<Chat> {
    conn.query_row(
        &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"),
        params![chat_id],
        row_to_chat,
    )
    .map_err(not_found)
}

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let last_at: Option<String> = row.get(5)?;
    let created_str: String = row.get(8)?;
    Ok(Chat {
        id: row.get(0)?,
        user_a: row.get(1)?,
        user_b: row.get(2)?,
        last_message: row.get(3)?,
        last_sender_id: row.get(4)?,
        last_message_at: parse_opt_timestamp(5, last_at)?,
        unread_a: row.get(6)?,
        unread_b: row.get(7)?,
        created_at: parse_timestamp(8, &created_str)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id_str: String = row.get(0)?;
    let ts_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    Ok(ChatMessage {
        id: parse_uuid(0, &id_str)?,
        chat_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        text: row.get(4)?,
        timestamp: parse_timestamp(5, &ts_str)?,
        status: parse_enum(6, &status_str)?,
    })
}
