use anyhow::Result;
use rusqlite::{Connection, params};

use crate::models::{ProfileUpdate, UserRow};
use crate::{Database, OptionalExt, timestamp_now};

impl Database {
    /// Insert a new, online user. Returns `false` if the handle already exists,
    /// which can happen when two first logins for the same handle race.
    pub fn create_user(&self, handle: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO users (handle, password, online, last_seen, created_at)
                 VALUES (?1, ?2, 1, 'Online', ?3)
                 ON CONFLICT(handle) DO NOTHING",
                params![handle, password_hash, timestamp_now()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_user(&self, handle: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, handle))
    }

    /// Set presence fields. Returns whether a user with that handle exists.
    pub fn set_presence(&self, handle: &str, online: bool, last_seen: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET online = ?2, last_seen = ?3 WHERE handle = ?1",
                params![handle, online, last_seen],
            )?;
            Ok(changed > 0)
        })
    }

    /// Change a user's handle and/or password hash.
    ///
    /// A new handle that equals the old one is not a collision. Chat ids and
    /// group member lists that mention the old handle are left alone.
    pub fn update_profile(
        &self,
        old_handle: &str,
        new_handle: Option<&str>,
        new_password_hash: Option<&str>,
    ) -> Result<ProfileUpdate> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_user(&tx, old_handle)?.is_none() {
                return Ok(ProfileUpdate::UserNotFound);
            }

            if let Some(new_handle) = new_handle.filter(|h| *h != old_handle) {
                if query_user(&tx, new_handle)?.is_some() {
                    return Ok(ProfileUpdate::HandleTaken);
                }
            }

            if let Some(hash) = new_password_hash {
                tx.execute(
                    "UPDATE users SET password = ?2 WHERE handle = ?1",
                    params![old_handle, hash],
                )?;
            }
            if let Some(new_handle) = new_handle {
                tx.execute(
                    "UPDATE users SET handle = ?2 WHERE handle = ?1",
                    params![old_handle, new_handle],
                )?;
            }

            tx.commit()?;
            Ok(ProfileUpdate::Updated)
        })
    }

    /// Fetch the users among `handles` that exist, in no particular order.
    pub fn get_users(&self, handles: &[String]) -> Result<Vec<UserRow>> {
        if handles.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=handles.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT handle, password, online, last_seen, created_at FROM users WHERE handle IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(handles.iter()), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// The entries of `handles` that name no user, in input order.
    pub fn missing_users(&self, handles: &[String]) -> Result<Vec<String>> {
        let found = self.get_users(handles)?;
        Ok(handles
            .iter()
            .filter(|h| !found.iter().any(|u| &u.handle == *h))
            .cloned()
            .collect())
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        handle: row.get(0)?,
        password: row.get(1)?,
        online: row.get(2)?,
        last_seen: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user(conn: &Connection, handle: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT handle, password, online, last_seen, created_at FROM users WHERE handle = ?1",
    )?;

    let row = stmt.query_row([handle], map_user).optional()?;

    Ok(row)
}
