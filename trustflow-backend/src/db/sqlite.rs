use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `database_url`; `:memory:` gives a private in-memory db
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        let conn = if database_url == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).ok();
                }
            }
            Connection::open(database_url)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Exclusive access to the connection; writers are serialized here
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();

        // Intents table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS intents (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                raw_intent TEXT
            )",
            [],
        )?;

        // Per-step outcomes, contiguous from step_index 0
        conn.execute(
            "CREATE TABLE IF NOT EXISTS intent_steps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                intent_id TEXT NOT NULL,
                step_index INTEGER NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                tx_hash TEXT,
                error_msg TEXT,
                FOREIGN KEY (intent_id) REFERENCES intents(id) ON DELETE CASCADE,
                UNIQUE(intent_id, step_index)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_intents_created_at ON intents(created_at DESC)",
            [],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("trustflow.db");

        let db = Database::new(db_path.to_str().unwrap()).expect("open db");
        drop(db);

        assert!(db_path.exists());
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("trustflow.db");
        let path = db_path.to_str().unwrap();

        drop(Database::new(path).expect("first open"));
        let db = Database::new(path).expect("second open");

        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('intents', 'intent_steps')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
