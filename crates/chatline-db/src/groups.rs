use anyhow::Result;
use rusqlite::{Connection, params};

use chatline_types::models::Group;

use crate::{Database, OptionalExt, timestamp_now};

impl Database {
    /// Insert a group. Returns `false` if the name is already taken.
    pub fn create_group(&self, name: &str, members: &[String]) -> Result<bool> {
        let members_json = serde_json::to_string(members)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                r#"INSERT INTO "groups" (name, members, created_at) VALUES (?1, ?2, ?3)
                   ON CONFLICT(name) DO NOTHING"#,
                params![name, members_json, timestamp_now()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_group(&self, name: &str) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let raw = conn
                .query_row(
                    r#"SELECT name, members, created_at FROM "groups" WHERE name = ?1"#,
                    [name],
                    map_raw_group,
                )
                .optional()?;
            raw.map(RawGroup::into_group).transpose()
        })
    }

    /// Groups that list `handle` among their members, oldest first.
    pub fn groups_for_member(&self, handle: &str) -> Result<Vec<Group>> {
        self.with_conn(|conn| query_groups_for_member(conn, handle))
    }
}

/// Names of the groups `handle` belongs to, and of every group in the store.
pub(crate) fn query_group_scope(conn: &Connection, handle: &str) -> Result<(Vec<String>, Vec<String>)> {
    let own: Vec<String> = query_groups_for_member(conn, handle)?
        .into_iter()
        .map(|g| g.name)
        .collect();
    Ok((own, query_group_names(conn)?))
}

pub(crate) fn query_group_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(r#"SELECT name FROM "groups""#)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// A group row before its JSON member list is decoded.
pub(crate) struct RawGroup {
    name: String,
    members: String,
    created_at: String,
}

impl RawGroup {
    pub(crate) fn into_group(self) -> Result<Group> {
        Ok(Group {
            members: serde_json::from_str(&self.members)?,
            name: self.name,
            created_at: Some(self.created_at),
        })
    }
}

fn map_raw_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGroup> {
    Ok(RawGroup {
        name: row.get(0)?,
        members: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub(crate) fn query_groups_for_member(conn: &Connection, handle: &str) -> Result<Vec<Group>> {
    let mut stmt = conn.prepare(
        r#"SELECT g.name, g.members, g.created_at FROM "groups" g
           WHERE EXISTS (SELECT 1 FROM json_each(g.members) WHERE json_each.value = ?1)
           ORDER BY g.created_at, g.name"#,
    )?;

    let raw = stmt
        .query_map([handle], map_raw_group)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter().map(RawGroup::into_group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn group_names_are_unique() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_group("crew", &members(&["alice", "bob"])).unwrap());
        assert!(!db.create_group("crew", &members(&["carol", "dave"])).unwrap());

        let group = db.get_group("crew").unwrap().unwrap();
        assert_eq!(group.members, members(&["alice", "bob"]));
        assert!(group.created_at.is_some());
        assert!(db.get_group("nope").unwrap().is_none());
    }

    #[test]
    fn groups_for_member_matches_exact_handles() {
        let db = Database::open_in_memory().unwrap();
        db.create_group("one", &members(&["alice", "bob"])).unwrap();
        db.create_group("two", &members(&["bob", "carol"])).unwrap();
        db.create_group("three", &members(&["alicia", "carol"])).unwrap();

        let names: Vec<String> = db
            .groups_for_member("alice")
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["one"]);
        assert_eq!(db.groups_for_member("bob").unwrap().len(), 2);
        assert!(db.groups_for_member("zed").unwrap().is_empty());
    }

    #[test]
    fn group_scope_splits_own_from_all() {
        let db = Database::open_in_memory().unwrap();
        db.create_group("one", &members(&["alice", "bob"])).unwrap();
        db.create_group("two", &members(&["bob", "carol"])).unwrap();

        let (own, mut all) = db.with_conn(|conn| query_group_scope(conn, "alice")).unwrap();
        all.sort();
        assert_eq!(own, vec!["one"]);
        assert_eq!(all, vec!["one", "two"]);
    }
}
