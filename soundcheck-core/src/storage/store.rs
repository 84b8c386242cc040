use std::fs;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::models::config::StoreConfiguration;
use crate::models::error::StoreError;
use crate::models::recording::{format_timestamp, Payload, Recording};

/// Current value of `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS recordings (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        title         TEXT    NOT NULL,
        payload       BLOB    NOT NULL,
        mime_type     TEXT    NOT NULL,
        duration_secs INTEGER NOT NULL,
        size          INTEGER NOT NULL,
        checksum      TEXT    NOT NULL,
        created_at    TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recordings_created_at ON recordings (created_at);
    CREATE INDEX IF NOT EXISTS idx_recordings_title ON recordings (title);
";

const SELECT_COLUMNS: &str =
    "SELECT id, title, payload, mime_type, duration_secs, size, checksum, created_at FROM recordings";

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable(e.to_string())
}

fn tx_failed(e: rusqlite::Error) -> StoreError {
    StoreError::TransactionFailed(e.to_string())
}

/// Trim `title` and reject it when blank or longer than `max_len`
/// characters. Returns the title as it is stored.
pub fn validate_title(title: &str, max_len: usize) -> Result<&str, StoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(StoreError::Validation(format!(
            "title is {} characters, maximum is {}",
            len, max_len
        )));
    }
    Ok(trimmed)
}

/// Row as stored, before timestamp parsing and checksum verification.
struct StoredRow {
    id: i64,
    title: String,
    payload: Vec<u8>,
    mime_type: String,
    duration_secs: i64,
    size: i64,
    checksum: String,
    created_at: String,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            payload: row.get(2)?,
            mime_type: row.get(3)?,
            duration_secs: row.get(4)?,
            size: row.get(5)?,
            checksum: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_recording(self, verify: bool) -> Result<Recording, StoreError> {
        let id = self.id;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| {
                log::error!("Recording {} has unreadable timestamp: {}", id, e);
                StoreError::Corrupted(id)
            })?
            .with_timezone(&Utc);

        let payload = Payload::new(self.payload, self.mime_type);
        if verify && payload.checksum() != self.checksum {
            log::error!("Recording {} failed checksum verification", id);
            return Err(StoreError::Corrupted(id));
        }

        Ok(Recording {
            id,
            title: self.title,
            payload,
            duration_secs: u32::try_from(self.duration_secs).map_err(|_| StoreError::Corrupted(id))?,
            size: u64::try_from(self.size).map_err(|_| StoreError::Corrupted(id))?,
            checksum: self.checksum,
            created_at,
        })
    }
}

/// Durable, queryable collection of saved recordings backed by SQLite.
///
/// The connection is opened (and the schema migrated) on first use. Every
/// operation runs under the connection lock, so concurrent first accesses
/// wait for the one open and all mutations are serialized.
pub struct RecordingStore {
    config: StoreConfiguration,
    conn: Mutex<Option<Connection>>,
}

impl RecordingStore {
    pub fn new(config: StoreConfiguration) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Validation)?;
        Ok(Self {
            config,
            conn: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &StoreConfiguration {
        &self.config
    }

    /// Store a new recording and return its id.
    pub fn create(&self, payload: &Payload, title: &str, duration_secs: u32) -> Result<i64, StoreError> {
        let title = validate_title(title, self.config.max_title_len)?;
        if payload.is_empty() {
            return Err(StoreError::Validation("payload must not be empty".into()));
        }
        if payload.size() > self.config.max_payload_bytes {
            return Err(StoreError::Validation(format!(
                "payload is {} bytes, maximum is {}",
                payload.size(),
                self.config.max_payload_bytes
            )));
        }

        let size = i64::try_from(payload.size())
            .map_err(|_| StoreError::Validation("payload too large".into()))?;
        let checksum = payload.checksum();
        let created_at = format_timestamp(&Utc::now());

        self.with_connection(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(tx_failed)?;
            tx.execute(
                "INSERT INTO recordings (title, payload, mime_type, duration_secs, size, checksum, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    title,
                    payload.bytes(),
                    payload.mime_type(),
                    duration_secs,
                    size,
                    checksum,
                    created_at
                ],
            )
            .map_err(tx_failed)?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(tx_failed)?;

            log::info!("Saved recording {} ({} bytes, {}s)", id, size, duration_secs);
            Ok(id)
        })
    }

    /// All recordings in insertion order.
    pub fn list_all(&self) -> Result<Vec<Recording>, StoreError> {
        self.query_list(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))
    }

    /// All recordings, newest first.
    pub fn list_recent(&self) -> Result<Vec<Recording>, StoreError> {
        self.query_list(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS))
    }

    /// Fetch one recording, verifying its payload checksum.
    pub fn fetch(&self, id: i64) -> Result<Option<Recording>, StoreError> {
        let row = self.with_connection(|conn| {
            conn.query_row(&format!("{} WHERE id = ?1", SELECT_COLUMNS), [id], StoredRow::read)
                .optional()
                .map_err(tx_failed)
        })?;
        row.map(|row| row.into_recording(true)).transpose()
    }

    /// Change the title of an existing recording. Nothing else changes.
    pub fn rename(&self, id: i64, new_title: &str) -> Result<(), StoreError> {
        let new_title = validate_title(new_title, self.config.max_title_len)?;

        self.with_connection(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(tx_failed)?;
            let exists = tx
                .query_row("SELECT 1 FROM recordings WHERE id = ?1", [id], |_| Ok(()))
                .optional()
                .map_err(tx_failed)?
                .is_some();
            if !exists {
                return Err(StoreError::NotFound(id));
            }
            tx.execute(
                "UPDATE recordings SET title = ?1 WHERE id = ?2",
                params![new_title, id],
            )
            .map_err(tx_failed)?;
            tx.commit().map_err(tx_failed)?;

            log::info!("Renamed recording {}", id);
            Ok(())
        })
    }

    /// Remove a recording. Deleting a missing id succeeds.
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.with_connection(|conn| {
            let removed = conn
                .execute("DELETE FROM recordings WHERE id = ?1", [id])
                .map_err(tx_failed)?;
            if removed == 0 {
                log::debug!("Delete of recording {}: not present", id);
            } else {
                log::info!("Deleted recording {}", id);
            }
            Ok(())
        })
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.with_connection(|conn| {
            let removed = conn.execute("DELETE FROM recordings", []).map_err(tx_failed)?;
            log::info!("Cleared {} recordings", removed);
            Ok(())
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM recordings", [], |row| row.get(0))
                .map_err(tx_failed)?;
            Ok(count.max(0) as u64)
        })
    }

    fn query_list(&self, sql: &str) -> Result<Vec<Recording>, StoreError> {
        let rows = self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql).map_err(tx_failed)?;
            let rows = stmt
                .query_map([], StoredRow::read)
                .map_err(tx_failed)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(tx_failed)?;
            Ok(rows)
        })?;
        rows.into_iter().map(|row| row.into_recording(false)).collect()
    }

    /// Run `f` with the connection, opening and migrating it first if this
    /// is the first access.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(StoreError::StorageUnavailable("connection not open".into())),
        }
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let path = &self.config.database_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let mut conn = Connection::open(path).map_err(unavailable)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(unavailable)?;
        migrate(&mut conn)?;

        log::debug!("Opened recording store at {}", path.display());
        Ok(conn)
    }
}

/// Bring the schema up to [`SCHEMA_VERSION`] inside one IMMEDIATE
/// transaction.
fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(tx_failed)?;
    let version: i32 = tx
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(tx_failed)?;

    if version < SCHEMA_VERSION {
        log::info!("Migrating recording store from v{} to v{}", version, SCHEMA_VERSION);
        tx.execute_batch(SCHEMA_V1).map_err(tx_failed)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .map_err(tx_failed)?;
    }

    tx.commit().map_err(tx_failed)
}

static SHARED_STORE: OnceLock<RecordingStore> = OnceLock::new();

/// Process-wide store configured from the environment
/// (see [`StoreConfiguration::from_env`]).
pub fn shared_store() -> Result<&'static RecordingStore, StoreError> {
    if let Some(store) = SHARED_STORE.get() {
        return Ok(store);
    }
    let store = RecordingStore::new(StoreConfiguration::from_env())?;
    Ok(SHARED_STORE.get_or_init(|| store))
}
