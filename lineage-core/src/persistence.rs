//! Durable per-entity memory slots.
//!
//! Each entity's lineage (stats, generation id, archive) is encoded with a
//! [`StorageCodec`] and stored under a `(slot, entity)` key. The SQLite
//! schema is intentionally simple:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS memory_slots (
//!     slot       TEXT NOT NULL,
//!     entity_id  TEXT NOT NULL,
//!     codec      TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT,
//!     PRIMARY KEY (slot, entity_id)
//! );
//! ```
//!
//! - The journal runs in WAL mode so hosts can read while a save is written.
//! - The codec is stored per row, so a world can switch codecs between runs.
//! - A CRC-32 of each row is kept when `checksum_enabled` is set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{LineageError, Result};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Codecs
// ---------------------------------------------------------------------------

/// Encoding used for a stored memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageCodec {
    /// Human-readable, largest.
    #[default]
    Json,
    /// Compact self-describing binary.
    MessagePack,
    /// Compact positional binary.
    Bincode,
}

impl StorageCodec {
    /// Tag stored alongside the data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "msgpack",
            Self::Bincode => "bincode",
        }
    }

    /// Parse a stored tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "json" => Some(Self::Json),
            "msgpack" => Some(Self::MessagePack),
            "bincode" => Some(Self::Bincode),
            _ => None,
        }
    }

    /// Encode `value`.
    ///
    /// # Errors
    /// Returns [`LineageError::Serialization`] if encoding fails.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Self::MessagePack => rmp_serde::to_vec_named(value).map_err(|e| e.to_string()),
            Self::Bincode => bincode::serialize(value).map_err(|e| e.to_string()),
        };
        bytes.map_err(LineageError::Serialization)
    }

    /// Decode a value previously produced by [`Self::encode`].
    ///
    /// # Errors
    /// Returns [`LineageError::Serialization`] if decoding fails.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        let value = match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Self::MessagePack => rmp_serde::from_slice(bytes).map_err(|e| e.to_string()),
            Self::Bincode => bincode::deserialize(bytes).map_err(|e| e.to_string()),
        };
        value.map_err(LineageError::Serialization)
    }
}

// ---------------------------------------------------------------------------
// Slot store abstraction
// ---------------------------------------------------------------------------

/// Raw bytes of one stored slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSlot {
    /// How `data` is encoded.
    pub codec: StorageCodec,
    /// Encoded record.
    pub data: Vec<u8>,
}

/// Durable storage keyed by `(slot, entity)`.
pub trait SlotStore: Send {
    /// Insert or replace a slot.
    ///
    /// # Errors
    /// Returns an error if the backing store rejects the write.
    fn write_slot(&mut self, slot: &str, entity: EntityId, stored: StoredSlot) -> Result<()>;

    /// Read a slot; `None` if it was never written.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    fn read_slot(&self, slot: &str, entity: EntityId) -> Result<Option<StoredSlot>>;

    /// Remove a slot. Returns `true` if something was deleted.
    ///
    /// # Errors
    /// Returns an error if the backing store rejects the delete.
    fn delete_slot(&mut self, slot: &str, entity: EntityId) -> Result<bool>;
}

/// Volatile slot store for tests and hosts without disk access.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    slots: HashMap<(String, EntityId), StoredSlot>,
}

impl InMemorySlotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SlotStore for InMemorySlotStore {
    fn write_slot(&mut self, slot: &str, entity: EntityId, stored: StoredSlot) -> Result<()> {
        self.slots.insert((slot.to_string(), entity), stored);
        Ok(())
    }

    fn read_slot(&self, slot: &str, entity: EntityId) -> Result<Option<StoredSlot>> {
        Ok(self.slots.get(&(slot.to_string(), entity)).cloned())
    }

    fn delete_slot(&mut self, slot: &str, entity: EntityId) -> Result<bool> {
        Ok(self.slots.remove(&(slot.to_string(), entity)).is_some())
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Reflected CRC-32 over `data`.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_slots (
    slot       TEXT NOT NULL,
    entity_id  TEXT NOT NULL,
    codec      TEXT NOT NULL,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT,
    PRIMARY KEY (slot, entity_id)
);";

/// SQLite-backed [`SlotStore`].
///
/// # Usage
///
/// ```no_run
/// # use lineage_core::persistence::{PersistenceEngine, SlotStore, StoredSlot, StorageCodec};
/// # use lineage_core::config::PersistenceConfig;
/// # use lineage_core::types::EntityId;
/// let mut engine = PersistenceEngine::open("world_save.db", &PersistenceConfig::default())?;
/// let entity = EntityId::new();
/// let slot = StoredSlot { codec: StorageCodec::Json, data: b"{}".to_vec() };
/// engine.write_slot("default", entity, slot)?;
/// let loaded = engine.read_slot("default", entity)?;
/// # Ok::<(), lineage_core::error::LineageError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open the save database at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "lineage persistence engine opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open a database that lives only as long as the engine.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// List entity ids that have data in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Database`] on SQLite failures.
    pub fn list_entities(&self, slot: &str) -> Result<Vec<EntityId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT entity_id FROM memory_slots WHERE slot = ?1")?;
        let rows = stmt.query_map(params![slot], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            let id_str = row?;
            if let Ok(uuid) = uuid::Uuid::parse_str(&id_str) {
                entities.push(EntityId(uuid));
            } else {
                warn!(id = %id_str, "Ignoring slot with malformed entity id");
            }
        }
        Ok(entities)
    }

    /// Location of the database, `:memory:` when not on disk.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// `PRAGMA integrity_check`; `true` when SQLite reports `ok`.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl SlotStore for PersistenceEngine {
    fn write_slot(&mut self, slot: &str, entity: EntityId, stored: StoredSlot) -> Result<()> {
        let start = Instant::now();
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&stored.data));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO memory_slots (slot, entity_id, codec, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(slot, entity_id) DO UPDATE SET
                codec = excluded.codec,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![slot, entity.0.to_string(), stored.codec.as_str(), stored.data, now, checksum],
        )?;

        debug!(
            entity = %entity,
            slot,
            codec = stored.codec.as_str(),
            bytes = stored.data.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved memory slot"
        );
        Ok(())
    }

    fn read_slot(&self, slot: &str, entity: EntityId) -> Result<Option<StoredSlot>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT codec, data, checksum FROM memory_slots WHERE slot = ?1 AND entity_id = ?2",
        )?;

        let row: Option<(String, Vec<u8>, Option<String>)> = stmt
            .query_row(params![slot, entity.0.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let Some((tag, data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        entity = %entity,
                        slot,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }

        let codec = StorageCodec::from_tag(&tag)
            .ok_or_else(|| LineageError::Persistence(format!("unknown codec tag `{tag}`")))?;
        Ok(Some(StoredSlot { codec, data }))
    }

    fn delete_slot(&mut self, slot: &str, entity: EntityId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM memory_slots WHERE slot = ?1 AND entity_id = ?2",
            params![slot, entity.0.to_string()],
        )?;
        Ok(deleted > 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(data: &[u8]) -> StoredSlot {
        StoredSlot { codec: StorageCodec::Json, data: data.to_vec() }
    }

    fn memory_engine() -> PersistenceEngine {
        PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    #[test]
    fn write_then_read() {
        let mut engine = memory_engine();
        let entity = EntityId::new();
        engine.write_slot("default", entity, slot(b"{\"a\":1}")).expect("write");
        let loaded = engine.read_slot("default", entity).expect("read").expect("Some");
        assert_eq!(loaded.data, b"{\"a\":1}".to_vec());
        assert_eq!(loaded.codec, StorageCodec::Json);
    }

    #[test]
    fn slots_are_isolated() {
        let mut engine = memory_engine();
        let entity = EntityId::new();
        engine.write_slot("a", entity, slot(b"1")).expect("write");
        assert!(engine.read_slot("b", entity).expect("read").is_none());
        assert_eq!(engine.list_entities("a").expect("list"), vec![entity]);
        assert!(engine.list_entities("b").expect("list").is_empty());
    }

    #[test]
    fn upsert_and_delete() {
        let mut engine = memory_engine();
        let entity = EntityId::new();
        engine.write_slot("s", entity, slot(b"1")).expect("write");
        engine
            .write_slot("s", entity, StoredSlot { codec: StorageCodec::Bincode, data: vec![2] })
            .expect("overwrite");
        let loaded = engine.read_slot("s", entity).expect("read").expect("Some");
        assert_eq!(loaded.codec, StorageCodec::Bincode);
        assert!(engine.delete_slot("s", entity).expect("delete"));
        assert!(!engine.delete_slot("s", entity).expect("delete again"));
    }

    #[test]
    fn corrupted_checksum_still_loads() {
        let mut engine = memory_engine();
        let entity = EntityId::new();
        engine.write_slot("s", entity, slot(b"[]")).expect("write");
        engine
            .conn
            .execute(
                "UPDATE memory_slots SET checksum = 'deadbeef' WHERE entity_id = ?1",
                params![entity.0.to_string()],
            )
            .expect("corrupt checksum");
        assert!(engine.read_slot("s", entity).expect("read").is_some());
    }

    #[test]
    fn file_backed_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lineage.db");
        let entity = EntityId::new();
        {
            let mut engine =
                PersistenceEngine::open(&path, &PersistenceConfig::default()).expect("open");
            engine.write_slot("default", entity, slot(b"{}")).expect("write");
        }
        let engine = PersistenceEngine::open(&path, &PersistenceConfig::default()).expect("reopen");
        assert!(engine.integrity_check().expect("check"));
        assert!(engine.read_slot("default", entity).expect("read").is_some());
    }

    #[test]
    fn codecs_agree_on_content() {
        let value = vec![("alpha".to_string(), 1.5f64), ("beta".to_string(), -2.0)];
        for codec in [StorageCodec::Json, StorageCodec::MessagePack, StorageCodec::Bincode] {
            let bytes = codec.encode(&value).expect("encode");
            let back: Vec<(String, f64)> = codec.decode(&bytes).expect("decode");
            assert_eq!(back, value, "{codec:?}");
            assert_eq!(StorageCodec::from_tag(codec.as_str()), Some(codec));
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = StorageCodec::Json.decode::<Vec<u8>>(b"not json").expect_err("must fail");
        assert!(matches!(err, LineageError::Serialization(_)));
    }

    #[test]
    fn crc32_basic() {
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
