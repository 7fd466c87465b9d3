//! SQLite schema definition.

/// Complete database schema for filevault.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Uploaded files (arrival log)
-- ============================================================================

CREATE TABLE IF NOT EXISTS vault_files (
    session_id TEXT NOT NULL,
    seq INTEGER NOT NULL,                        -- arrival position within the session
    file_name TEXT NOT NULL,
    digest TEXT NOT NULL,                        -- leaf digest (hex)
    size INTEGER NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (session_id, seq),
    UNIQUE (session_id, file_name)
);

CREATE INDEX IF NOT EXISTS idx_vault_files_digest ON vault_files(digest);

-- ============================================================================
-- Session roots
-- ============================================================================

CREATE TABLE IF NOT EXISTS root_records (
    session_id TEXT PRIMARY KEY,
    root_hash TEXT NOT NULL,
    leaf_count INTEGER NOT NULL,
    tree_height INTEGER NOT NULL,
    scheme TEXT NOT NULL CHECK (scheme IN ('plain', 'tagged')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
