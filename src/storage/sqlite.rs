//! SQLite content hash index
//!
//! Alternative to the JSON document for large crawls; selected with
//! `hash-index-backend = "sqlite"`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentHashIndex, StorageError, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const UPSERT_SQL: &str = "INSERT INTO content_hashes (host, url, hash, timestamp) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(host, url) DO UPDATE SET hash = excluded.hash, timestamp = excluded.timestamp";

/// SQLite hash index backend
pub struct SqliteHashIndex {
    conn: Mutex<Connection>,
}

impl SqliteHashIndex {
    /// Opens or creates the database at `path`
    ///
    /// A file that is not a readable SQLite database is moved aside to
    /// `<path>.corrupt-<timestamp>` and replaced by an empty index.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = match open_connection(path) {
            Ok(conn) => conn,
            Err(e) if is_corrupt(&e) => {
                let aside = move_aside(path)?;
                tracing::warn!(
                    "Hash index {} is corrupt ({}), moved to {}; starting empty",
                    path.display(),
                    e,
                    aside.display()
                );
                open_connection(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

impl ContentHashIndex for SqliteHashIndex {
    fn lookup(&self, host: &str, url: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let hash = conn
            .query_row(
                "SELECT hash FROM content_hashes WHERE host = ?1 AND url = ?2",
                params![host, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    fn update(
        &self,
        host: &str,
        url: &str,
        hash: &str,
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            UPSERT_SQL,
            params![
                host,
                url,
                hash,
                timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
            ],
        )?;
        Ok(())
    }

    fn update_many(
        &self,
        host: &str,
        entries: &[(String, String)],
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()> {
        let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for (url, hash) in entries {
                stmt.execute(params![host, url, hash, stamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM content_hashes", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;
    Ok(conn)
}

fn is_corrupt(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

/// Renames a damaged database out of the way, dropping its WAL side files
fn move_aside(path: &Path) -> std::io::Result<PathBuf> {
    let aside = PathBuf::from(format!(
        "{}.corrupt-{}",
        path.display(),
        Utc::now().format("%Y%m%dT%H%M%S")
    ));
    fs::rename(path, &aside)?;

    for suffix in ["-wal", "-shm"] {
        let side = PathBuf::from(format!("{}{}", path.display(), suffix));
        if let Err(e) = fs::remove_file(&side) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", side.display(), e);
            }
        }
    }
    Ok(aside)
}
