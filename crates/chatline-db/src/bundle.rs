//! Whole-account export and replace.

use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::info;

use chatline_types::chat::ChatScope;
use chatline_types::models::{ExportBundle, StoredMessage};

use crate::groups::{query_group_names, query_group_scope, query_groups_for_member};
use crate::messages::map_raw_message;
use crate::models::ImportOutcome;
use crate::{Database, timestamp_now};

impl Database {
    /// Every message in a chat that involves `handle`, in creation order, and
    /// every group that lists `handle` as a member.
    pub fn export_for(&self, handle: &str) -> Result<ExportBundle> {
        self.with_conn(|conn| export_with(conn, handle))
    }

    /// Replace everything `handle` owns with `bundle`.
    ///
    /// Deletes the messages of every chat involving the user and every group
    /// the user belongs to, then inserts the bundle, all in one transaction.
    /// Nothing is touched when a bundle group reuses the name of a group the
    /// user is not in, or when a bundle chat would not involve the user once
    /// the bundle's groups are in place.
    pub fn replace_for(&self, handle: &str, bundle: &ExportBundle) -> Result<ImportOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (old_groups, all_groups) = query_group_scope(&tx, handle)?;

            let taken: Vec<String> = bundle
                .groups
                .iter()
                .filter(|g| all_groups.contains(&g.name) && !old_groups.contains(&g.name))
                .map(|g| g.name.clone())
                .collect();
            if !taken.is_empty() {
                return Ok(ImportOutcome::GroupNamesTaken(taken));
            }

            let foreign = foreign_chats(handle, bundle, &old_groups, &all_groups);
            if !foreign.is_empty() {
                return Ok(ImportOutcome::ForeignChats(foreign));
            }

            let chat_ids: Vec<String> = {
                let mut stmt = tx.prepare("SELECT DISTINCT chat_id FROM messages")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                ids
            };

            let old_scope = ChatScope::new(handle, &old_groups, &all_groups);
            let mut deleted_messages = 0;
            for chat_id in chat_ids.iter().filter(|c| old_scope.involves(c)) {
                deleted_messages += tx.execute("DELETE FROM messages WHERE chat_id = ?1", [chat_id])?;
            }
            for name in &old_groups {
                tx.execute(r#"DELETE FROM "groups" WHERE name = ?1"#, [name])?;
            }

            let now = timestamp_now();
            for group in &bundle.groups {
                // Only a name repeated within the bundle can conflict here.
                tx.execute(
                    r#"INSERT INTO "groups" (name, members, created_at) VALUES (?1, ?2, ?3)
                       ON CONFLICT(name) DO UPDATE SET members = excluded.members, created_at = excluded.created_at"#,
                    params![
                        group.name,
                        serde_json::to_string(&group.members)?,
                        group.created_at.as_deref().unwrap_or(&now),
                    ],
                )?;
            }
            for stored in &bundle.messages {
                tx.execute(
                    "INSERT INTO messages (chat_id, message, created_at) VALUES (?1, ?2, ?3)",
                    params![
                        stored.chat_id,
                        serde_json::to_string(&stored.message)?,
                        stored.created_at.as_deref().unwrap_or(&now),
                    ],
                )?;
            }

            tx.commit()?;
            info!(
                "Replaced data for {}: removed {} messages and {} groups, wrote {} messages and {} groups",
                handle,
                deleted_messages,
                old_groups.len(),
                bundle.messages.len(),
                bundle.groups.len()
            );
            Ok(ImportOutcome::Imported {
                messages: bundle.messages.len(),
                groups: bundle.groups.len(),
            })
        })
    }
}

fn export_with(conn: &Connection, handle: &str) -> Result<ExportBundle> {
    let groups = query_groups_for_member(conn, handle)?;
    let own_groups: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
    let all_groups = query_group_names(conn)?;
    let scope = ChatScope::new(handle, &own_groups, &all_groups);

    let mut stmt =
        conn.prepare("SELECT chat_id, message, created_at FROM messages ORDER BY created_at, id")?;
    let raw = stmt
        .query_map([], map_raw_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let messages = raw
        .into_iter()
        .filter(|m| scope.involves(&m.chat_id))
        .map(|m| m.into_stored())
        .collect::<Result<Vec<StoredMessage>>>()?;

    Ok(ExportBundle { messages, groups })
}

/// Chat ids in `bundle` that `handle` would not take part in after the
/// import: the user's old groups are gone and the bundle's groups exist.
fn foreign_chats(
    handle: &str,
    bundle: &ExportBundle,
    old_groups: &[String],
    all_groups: &[String],
) -> Vec<String> {
    let new_own: Vec<String> = bundle
        .groups
        .iter()
        .filter(|g| g.members.iter().any(|m| m == handle))
        .map(|g| g.name.clone())
        .collect();
    let new_all: Vec<String> = all_groups
        .iter()
        .filter(|name| !old_groups.contains(*name))
        .chain(bundle.groups.iter().map(|g| &g.name))
        .cloned()
        .collect();
    let scope = ChatScope::new(handle, &new_own, &new_all);

    let mut foreign: Vec<String> = Vec::new();
    for stored in &bundle.messages {
        if !scope.involves(&stored.chat_id) && !foreign.contains(&stored.chat_id) {
            foreign.push(stored.chat_id.clone());
        }
    }
    foreign
}
