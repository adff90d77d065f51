//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. It is opened explicitly by
//! the owner (usually the server at startup) and handed to whoever needs it;
//! there is no process-wide handle.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/celeste/celeste.db`
    /// - macOS:   `~/Library/Application Support/com.celeste.celeste/celeste.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\celeste\celeste\data\celeste.db`
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_path()?)
    }

    /// Path used by [`Database::open`]. Creates the parent directory.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "celeste", "celeste").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("celeste.db"))
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Run schema migrations.
        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Close the connection, surfacing any error SQLite reports on shutdown.
    ///
    /// Dropping a `Database` also closes it, but silently.
    pub fn close(self) -> Result<()> {
        let path = self.path();
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        tracing::debug!(path = ?path, "database closed");
        Ok(())
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed CRUD helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::CURRENT_VERSION;

    fn schema_version(db: &Database) -> u32 {
        db.conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
        assert_eq!(schema_version(&db), CURRENT_VERSION);
        db.close().expect("should close");
    }

    #[test]
    fn open_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("chats.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(path.exists());
        db.close().unwrap();
    }

    #[test]
    fn reopen_keeps_schema_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).unwrap();
        db.conn()
            .execute(
                "INSERT INTO chats (title, history, created_at) VALUES ('t', '[]', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        db.close().unwrap();

        let db = Database::open_at(&path).unwrap();
        assert_eq!(schema_version(&db), CURRENT_VERSION);
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).unwrap();
        db.conn()
            .pragma_update(None, "user_version", CURRENT_VERSION + 1)
            .unwrap();
        db.close().unwrap();

        assert!(matches!(
            Database::open_at(&path),
            Err(StoreError::Migration(_))
        ));
    }
}
