use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::data::{DeleteAction, FileRecord, Rotation};
use super::error::{Error, Result};
use super::settings::DiscardScope;

/// The RecordStore manages the SQLite annotation database.
/// It holds one row per (folder, filename) with the keep/delete decision and rotation.
pub struct RecordStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl RecordStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        debug!("📁 Database opened at: {}", db_path.display());

        let store = RecordStore {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let store = RecordStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates the `files` table if it doesn't exist.
    /// Storage order (rowid) is the listing order.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                folder          TEXT NOT NULL,
                filename        TEXT NOT NULL,
                delete_action   TEXT,
                rotation        INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (folder, filename)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_delete_action
             ON files(delete_action)",
            [],
        )?;

        Ok(())
    }

    /// Path to the database file (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Seed a record for every filename not yet known under `folder`.
    ///
    /// Existing records are left untouched. All inserts go through one
    /// transaction. Returns how many records were created.
    pub fn ensure<S: AsRef<str>>(&self, folder: &str, filenames: &[S]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO files (folder, filename, delete_action, rotation)
                 VALUES (?1, ?2, NULL, 0)",
            )?;
            for filename in filenames {
                inserted += stmt.execute(params![folder, filename.as_ref()])?;
            }
        }
        tx.commit()?;

        debug!("Seeded {} new records in {}", inserted, folder);
        Ok(inserted)
    }

    /// Fetch one record. Fails with `NotFound` when it was never seeded.
    pub fn get(&self, folder: &str, filename: &str) -> Result<FileRecord> {
        self.conn
            .query_row(
                "SELECT folder, filename, delete_action, rotation
                 FROM files WHERE folder = ?1 AND filename = ?2",
                params![folder, filename],
                record_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound {
                folder: folder.to_string(),
                filename: filename.to_string(),
            })
    }

    /// Overwrite both annotation fields of one record
    pub fn update(
        &self,
        folder: &str,
        filename: &str,
        delete_action: DeleteAction,
        rotation: Rotation,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE files SET delete_action = ?1, rotation = ?2
             WHERE folder = ?3 AND filename = ?4",
            params![delete_action, rotation.degrees(), folder, filename],
        )?;

        if changed == 0 {
            return Err(Error::NotFound {
                folder: folder.to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(())
    }

    /// Records of one page, in storage order
    pub fn page_records(&self, folder: &str, offset: usize, limit: usize) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT folder, filename, delete_action, rotation
             FROM files WHERE folder = ?1
             ORDER BY rowid
             LIMIT ?2 OFFSET ?3",
        )?;

        let records = stmt
            .query_map(params![folder, limit as i64, offset as i64], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Filenames of one page, in storage order
    pub fn list_page(&self, folder: &str, offset: usize, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .page_records(folder, offset, limit)?
            .into_iter()
            .map(|record| record.filename)
            .collect())
    }

    /// Remove a record permanently. Returns whether it existed.
    pub fn delete(&self, folder: &str, filename: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM files WHERE folder = ?1 AND filename = ?2",
            params![folder, filename],
        )?;
        Ok(removed > 0)
    }

    /// Number of records under `folder`
    pub fn count(&self, folder: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files WHERE folder = ?1",
            params![folder],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Every record marked for deletion, within `scope`
    pub fn marked_for_delete(&self, scope: DiscardScope, folder: &str) -> Result<Vec<FileRecord>> {
        let records = match scope {
            DiscardScope::Folder => {
                let mut stmt = self.conn.prepare(
                    "SELECT folder, filename, delete_action, rotation
                     FROM files WHERE delete_action = 'delete' AND folder = ?1
                     ORDER BY rowid",
                )?;
                let rows = stmt.query_map(params![folder], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            DiscardScope::All => {
                let mut stmt = self.conn.prepare(
                    "SELECT folder, filename, delete_action, rotation
                     FROM files WHERE delete_action = 'delete'
                     ORDER BY rowid",
                )?;
                let rows = stmt.query_map([], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(records)
    }

    /// How many records a discard run over `scope` would consume
    pub fn count_marked(&self, scope: DiscardScope, folder: &str) -> Result<usize> {
        Ok(self.marked_for_delete(scope, folder)?.len())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        folder: row.get(0)?,
        filename: row.get(1)?,
        delete_action: row.get(2)?,
        rotation: Rotation::normalized(row.get(3)?),
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
