#![forbid(unsafe_code)]

mod error;
mod goals;
mod schema;
mod seed;

pub use error::StoreError;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DB_FILE_NAME: &str = "goalmap.db";

/// Goal records in one SQLite file. Children are removed by the
/// `ON DELETE CASCADE` foreign key, so the connection always runs with
/// `foreign_keys` enabled.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::install_schema(&conn)?;
        debug!(path = %db_path.display(), "goal store opened");

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
    }
}
