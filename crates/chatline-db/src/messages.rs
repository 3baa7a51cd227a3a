use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::Value;
use tracing::debug;

use chatline_types::chat::ChatScope;
use chatline_types::models::{ChatMessage, StoredMessage};

use crate::groups::query_group_scope;
use crate::{Database, OptionalExt, timestamp_now};

impl Database {
    pub fn insert_message(&self, chat_id: &str, message: &ChatMessage) -> Result<()> {
        let doc = serde_json::to_string(message)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (chat_id, message, created_at) VALUES (?1, ?2, ?3)",
                params![chat_id, doc, timestamp_now()],
            )?;
            Ok(())
        })
    }

    /// All messages of a chat in creation order.
    pub fn get_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, message, created_at FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at, id",
            )?;
            let raw = stmt
                .query_map([chat_id], map_raw_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            raw.into_iter().map(RawMessage::into_stored).collect()
        })
    }

    /// Set `read` on every message of the chat whose embedded timestamp equals
    /// `timestamp`. Returns how many were touched.
    pub fn mark_read(&self, chat_id: &str, timestamp: &Value) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let rows: Vec<(i64, String)> = {
                let mut stmt = tx.prepare("SELECT id, message FROM messages WHERE chat_id = ?1")?;
                let rows = stmt
                    .query_map([chat_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            let mut touched = 0;
            for (id, doc) in rows {
                let mut message: ChatMessage = serde_json::from_str(&doc)?;
                if &message.timestamp != timestamp {
                    continue;
                }
                message.read = true;
                write_message(&tx, id, &message)?;
                touched += 1;
            }

            tx.commit()?;
            Ok(touched)
        })
    }

    /// Apply `edit` to the message at position `index` of the chat (creation
    /// order). Returns `false`, touching nothing, if there is no such position.
    ///
    /// Positions shift when messages are inserted or deleted concurrently, so
    /// under contention this may hit a neighbouring message.
    pub fn update_message_at<F>(&self, chat_id: &str, index: u64, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut ChatMessage),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some((id, doc)) = message_at(&tx, chat_id, index)? else {
                return Ok(false);
            };
            let mut message: ChatMessage = serde_json::from_str(&doc)?;
            edit(&mut message);
            write_message(&tx, id, &message)?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Delete the message at position `index` of the chat. Same addressing as
    /// [`Database::update_message_at`].
    pub fn delete_message_at(&self, chat_id: &str, index: u64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some((id, _)) = message_at(&tx, chat_id, index)? else {
                return Ok(false);
            };
            tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn clear_chat(&self, chat_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE chat_id = ?1", [chat_id])?;
            debug!("Cleared {} messages from chat {}", deleted, chat_id);
            Ok(deleted)
        })
    }

    /// The newest message of every chat that involves `handle`, newest chat first.
    pub fn latest_messages_for(&self, handle: &str) -> Result<Vec<StoredMessage>> {
        self.with_conn(|conn| {
            let (own_groups, all_groups) = query_group_scope(conn, handle)?;
            let scope = ChatScope::new(handle, &own_groups, &all_groups);

            let mut stmt = conn.prepare(
                "SELECT m.chat_id, m.message, m.created_at FROM messages m
                 WHERE m.id = (
                     SELECT id FROM messages
                     WHERE chat_id = m.chat_id
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1
                 )
                 ORDER BY m.created_at DESC, m.id DESC",
            )?;
            let raw = stmt
                .query_map([], map_raw_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            raw.into_iter()
                .filter(|m| scope.involves(&m.chat_id))
                .map(RawMessage::into_stored)
                .collect()
        })
    }
}

/// A message row before its JSON document is decoded.
pub(crate) struct RawMessage {
    pub(crate) chat_id: String,
    message: String,
    created_at: String,
}

impl RawMessage {
    pub(crate) fn into_stored(self) -> Result<StoredMessage> {
        Ok(StoredMessage {
            message: serde_json::from_str(&self.message)?,
            chat_id: self.chat_id,
            created_at: Some(self.created_at),
        })
    }
}

pub(crate) fn map_raw_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
    Ok(RawMessage {
        chat_id: row.get(0)?,
        message: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Resolve a positional index to `(row id, document)`.
fn message_at(conn: &Connection, chat_id: &str, index: u64) -> Result<Option<(i64, String)>> {
    let Ok(offset) = i64::try_from(index) else {
        return Ok(None);
    };

    conn.query_row(
        "SELECT id, message FROM messages
         WHERE chat_id = ?1
         ORDER BY created_at, id
         LIMIT 1 OFFSET ?2",
        params![chat_id, offset],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

fn write_message(conn: &Connection, id: i64, message: &ChatMessage) -> Result<()> {
    conn.execute(
        "UPDATE messages SET message = ?2 WHERE id = ?1",
        params![id, serde_json::to_string(message)?],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(content: &str, timestamp: i64) -> ChatMessage {
        serde_json::from_value(json!({
            "content": content,
            "timestamp": timestamp,
            "read": false,
            "reactions": [],
        }))
        .unwrap()
    }

    fn contents(db: &Database, chat_id: &str) -> Vec<String> {
        db.get_messages(chat_id)
            .unwrap()
            .into_iter()
            .map(|m| m.message.content)
            .collect()
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("alice-bob", &msg("first", 1)).unwrap();
        db.insert_message("alice-bob", &msg("second", 2)).unwrap();
        db.insert_message("alice-bob", &msg("third", 3)).unwrap();
        db.insert_message("carol-dave", &msg("elsewhere", 1)).unwrap();
        db
    }

    #[test]
    fn messages_keep_insertion_order() {
        let db = seeded();
        assert_eq!(contents(&db, "alice-bob"), vec!["first", "second", "third"]);
    }

    #[test]
    fn update_by_index() {
        let db = seeded();
        assert!(db.update_message_at("alice-bob", 1, |m| m.content = "edited".into()).unwrap());
        assert_eq!(contents(&db, "alice-bob"), vec!["first", "edited", "third"]);
    }

    #[test]
    fn index_past_end_touches_nothing() {
        let db = seeded();
        let mut called = false;
        assert!(!db.update_message_at("alice-bob", 3, |_| called = true).unwrap());
        assert!(!called);
        assert!(!db.delete_message_at("alice-bob", 3).unwrap());
        assert!(!db.delete_message_at("alice-bob", u64::MAX).unwrap());
        assert_eq!(contents(&db, "alice-bob").len(), 3);
    }

    #[test]
    fn delete_shifts_later_indices() {
        let db = seeded();
        assert!(db.delete_message_at("alice-bob", 0).unwrap());
        assert_eq!(contents(&db, "alice-bob"), vec!["second", "third"]);
        assert!(db.delete_message_at("alice-bob", 0).unwrap());
        assert_eq!(contents(&db, "alice-bob"), vec!["third"]);
    }

    #[test]
    fn mark_read_matches_on_timestamp() {
        let db = seeded();
        assert_eq!(db.mark_read("alice-bob", &json!(2)).unwrap(), 1);
        assert_eq!(db.mark_read("alice-bob", &json!("2")).unwrap(), 0);

        let read: Vec<bool> = db
            .get_messages("alice-bob")
            .unwrap()
            .into_iter()
            .map(|m| m.message.read)
            .collect();
        assert_eq!(read, vec![false, true, false]);
        // Same timestamp in another chat is untouched
        assert!(!db.get_messages("carol-dave").unwrap()[0].message.read);
    }

    #[test]
    fn clear_chat_only_hits_that_chat() {
        let db = seeded();
        assert_eq!(db.clear_chat("alice-bob").unwrap(), 3);
        assert!(contents(&db, "alice-bob").is_empty());
        assert_eq!(contents(&db, "carol-dave"), vec!["elsewhere"]);
    }

    #[test]
    fn latest_messages_filters_by_participant() {
        let db = seeded();
        db.create_group("crew", &["alice".to_string(), "bob".to_string()]).unwrap();
        db.insert_message("crew", &msg("group hello", 9)).unwrap();

        let latest = db.latest_messages_for("alice").unwrap();
        let chats: Vec<&str> = latest.iter().map(|m| m.chat_id.as_str()).collect();
        assert_eq!(chats, vec!["crew", "alice-bob"]);
        assert_eq!(latest[1].message.content, "third");

        assert!(db.latest_messages_for("zed").unwrap().is_empty());
    }

    #[test]
    fn latest_messages_skip_groups_the_user_is_not_in() {
        let db = Database::open_in_memory().unwrap();
        db.create_group("book-club", &["alice".to_string(), "carol".to_string()]).unwrap();
        db.insert_message("book-club", &msg("chapter 3?", 1)).unwrap();

        assert_eq!(db.latest_messages_for("alice").unwrap().len(), 1);
        assert!(db.latest_messages_for("book").unwrap().is_empty());
        assert!(db.latest_messages_for("club").unwrap().is_empty());
    }
}
