//! Persisted session roots.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{Database, DbError, DbResult};
use crate::merkle::HashScheme;

/// Latest root of an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub session_id: Uuid,
    pub root_hash: String,
    pub leaf_count: u32,
    pub tree_height: u32,
    pub scheme: HashScheme,
    pub updated_at: String,
}

type RootRow = (String, String, u32, u32, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RootRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl TryFrom<RootRow> for RootRecord {
    type Error = DbError;

    fn try_from(row: RootRow) -> DbResult<Self> {
        let (session_id, root_hash, leaf_count, tree_height, scheme, updated_at) = row;
        let scheme = HashScheme::parse(&scheme)
            .ok_or_else(|| DbError::Constraint(format!("unknown hash scheme: {}", scheme)))?;
        Ok(RootRecord {
            session_id: Uuid::parse_str(&session_id)?,
            root_hash,
            leaf_count,
            tree_height,
            scheme,
            updated_at,
        })
    }
}

impl Database {
    /// Insert or replace the root of a session.
    pub fn upsert_root(
        &self,
        session_id: Uuid,
        root_hash: &str,
        leaf_count: u32,
        tree_height: u32,
        scheme: HashScheme,
    ) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO root_records (session_id, root_hash, leaf_count, tree_height, scheme, updated_at)
            VALUES (?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(session_id) DO UPDATE SET
                root_hash = excluded.root_hash,
                leaf_count = excluded.leaf_count,
                tree_height = excluded.tree_height,
                scheme = excluded.scheme,
                updated_at = excluded.updated_at
            "#,
            params![
                session_id.to_string(),
                root_hash,
                leaf_count,
                tree_height,
                scheme.as_str()
            ],
        )?;
        Ok(())
    }

    /// Get the persisted root of a session.
    pub fn get_root(&self, session_id: Uuid) -> DbResult<Option<RootRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT session_id, root_hash, leaf_count, tree_height, scheme, updated_at
                FROM root_records
                WHERE session_id = ?
                "#,
                [session_id.to_string()],
                read_row,
            )
            .optional()?;
        row.map(RootRecord::try_from).transpose()
    }

    /// All persisted roots, most recently updated first.
    pub fn list_roots(&self) -> DbResult<Vec<RootRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT session_id, root_hash, leaf_count, tree_height, scheme, updated_at
            FROM root_records
            ORDER BY updated_at DESC, session_id
            "#,
        )?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RootRecord::try_from).collect()
    }
}
