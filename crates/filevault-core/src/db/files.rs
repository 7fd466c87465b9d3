//! Arrival log of stored files.

use rusqlite::{params, ErrorCode, OptionalExtension};
use uuid::Uuid;

use super::{Database, DbError, DbResult};

/// A stored file as recorded in the arrival log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub session_id: Uuid,
    /// Arrival position within the session (leaf index)
    pub seq: u32,
    pub file_name: String,
    pub digest: String,
    pub size: u64,
    pub stored_at: String,
}

type FileRow = (String, u32, String, String, i64, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl TryFrom<FileRow> for FileRecord {
    type Error = DbError;

    fn try_from(row: FileRow) -> DbResult<Self> {
        let (session_id, seq, file_name, digest, size, stored_at) = row;
        Ok(FileRecord {
            session_id: Uuid::parse_str(&session_id)?,
            seq,
            file_name,
            digest,
            size: size as u64,
            stored_at,
        })
    }
}

impl Database {
    /// Append a file to a session's arrival log, returning its sequence number.
    pub fn record_file(
        &self,
        session_id: Uuid,
        file_name: &str,
        digest: &str,
        size: u64,
    ) -> DbResult<u32> {
        let session = session_id.to_string();
        let seq: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM vault_files WHERE session_id = ?",
            [&session],
            |row| row.get(0),
        )?;

        self.conn
            .execute(
                "INSERT INTO vault_files (session_id, seq, file_name, digest, size) VALUES (?, ?, ?, ?, ?)",
                params![session, seq, file_name, digest, size as i64],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    DbError::Constraint(format!(
                        "file {} already recorded in session {}",
                        file_name, session_id
                    ))
                }
                other => other.into(),
            })?;

        Ok(seq)
    }

    /// Files of one session in arrival order.
    pub fn list_files(&self, session_id: Uuid) -> DbResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT session_id, seq, file_name, digest, size, stored_at
            FROM vault_files
            WHERE session_id = ?
            ORDER BY seq
            "#,
        )?;
        let rows = stmt
            .query_map([session_id.to_string()], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Look up one file by name within a session.
    pub fn find_file(&self, session_id: Uuid, file_name: &str) -> DbResult<Option<FileRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT session_id, seq, file_name, digest, size, stored_at
                FROM vault_files
                WHERE session_id = ? AND file_name = ?
                "#,
                params![session_id.to_string(), file_name],
                read_row,
            )
            .optional()?;
        row.map(FileRecord::try_from).transpose()
    }

    /// Leaf digests of one session in arrival order.
    pub fn leaf_digests(&self, session_id: Uuid) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT digest FROM vault_files WHERE session_id = ? ORDER BY seq")?;
        let rows = stmt.query_map([session_id.to_string()], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every session that has at least one recorded file.
    pub fn recorded_sessions(&self) -> DbResult<Vec<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT session_id FROM vault_files ORDER BY session_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|id| Uuid::parse_str(id).map_err(DbError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_record_and_list_in_arrival_order() {
        let db = setup_db();
        let session = Uuid::new_v4();

        assert_eq!(db.record_file(session, "b.txt", "d-b", 3).unwrap(), 0);
        assert_eq!(db.record_file(session, "a.txt", "d-a", 5).unwrap(), 1);
        assert_eq!(db.record_file(session, "c.txt", "d-c", 7).unwrap(), 2);

        let files = db.list_files(session).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
        assert_eq!(files[1].size, 5);

        assert_eq!(db.leaf_digests(session).unwrap(), vec!["d-b", "d-a", "d-c"]);
    }

    #[test]
    fn test_sequences_are_per_session() {
        let db = setup_db();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        db.record_file(first, "a", "d1", 1).unwrap();
        db.record_file(first, "b", "d2", 1).unwrap();
        assert_eq!(db.record_file(second, "a", "d1", 1).unwrap(), 0);

        let mut sessions = db.recorded_sessions().unwrap();
        sessions.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(sessions, expected);
    }

    #[test]
    fn test_duplicate_name_is_constraint_error() {
        let db = setup_db();
        let session = Uuid::new_v4();

        db.record_file(session, "a.txt", "d1", 1).unwrap();
        let err = db.record_file(session, "a.txt", "d2", 1).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_find_file() {
        let db = setup_db();
        let session = Uuid::new_v4();
        db.record_file(session, "a.txt", "d1", 9).unwrap();

        let record = db.find_file(session, "a.txt").unwrap().unwrap();
        assert_eq!(record.session_id, session);
        assert_eq!(record.seq, 0);
        assert_eq!(record.digest, "d1");

        assert!(db.find_file(session, "missing.txt").unwrap().is_none());
        assert!(db.find_file(Uuid::new_v4(), "a.txt").unwrap().is_none());
    }
}
