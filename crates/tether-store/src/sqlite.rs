//! SQLite implementations of the store traits.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. One database file can back both the blob
//! cache and the key store; see [`SqliteKeyStore::sharing`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tether_core::{now_millis, ContentPointer, Identity};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentStore, KeyRecord, LocalKeyStore};

type SharedConn = Arc<Mutex<Connection>>;

fn open_conn(path: impl AsRef<Path>) -> Result<SharedConn> {
    let mut conn = Connection::open(path)?;
    migration::migrate(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn open_memory_conn() -> Result<SharedConn> {
    let mut conn = Connection::open_in_memory()?;
    migration::migrate(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Run a blocking closure against the connection off the async runtime.
async fn with_conn<F, T>(conn: &SharedConn, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = conn.clone();
    tokio::task::spawn_blocking(move || {
        let conn = conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("mutex poisoned: {}", e)))?;
        f(&conn)
    })
    .await
    .map_err(|e| StoreError::Internal(format!("spawn_blocking failed: {}", e)))?
}

fn pointer_from_blob(bytes: Vec<u8>) -> Result<ContentPointer> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData("pointer column is not 32 bytes".into()))?;
    Ok(ContentPointer::from_bytes(arr))
}

fn identity_from_blob(bytes: Vec<u8>) -> Result<Identity> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData("identity column is not 32 bytes".into()))?;
    Ok(Identity::from_bytes(arr))
}

/// SQLite-backed blob cache.
///
/// Thread-safe via internal Mutex.
#[derive(Clone)]
pub struct SqliteContentStore {
    conn: SharedConn,
}

impl SqliteContentStore {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: open_conn(path)?,
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: open_memory_conn()?,
        })
    }

    /// All pointers currently cached, oldest first.
    pub async fn list_pointers(&self) -> Result<Vec<ContentPointer>> {
        with_conn(&self.conn, |conn| {
            let mut stmt = conn.prepare("SELECT pointer FROM blobs ORDER BY stored_at, pointer")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
            let mut pointers = Vec::new();
            for row in rows {
                pointers.push(pointer_from_blob(row?)?);
            }
            Ok(pointers)
        })
        .await
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentPointer> {
        let pointer = ContentPointer::of(data);
        let data = data.to_vec();

        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blobs (pointer, data, size, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    pointer.as_bytes().as_slice(),
                    data,
                    data.len() as i64,
                    now_millis()
                ],
            )?;
            Ok(pointer)
        })
        .await
    }

    async fn get_raw(&self, pointer: &ContentPointer) -> Result<Bytes> {
        let pointer = *pointer;

        let data: Option<Vec<u8>> = with_conn(&self.conn, move |conn| {
            conn.query_row(
                "SELECT data FROM blobs WHERE pointer = ?1",
                params![pointer.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await?;

        let data = data.ok_or_else(|| StoreError::NotFound(pointer.to_hex()))?;
        if !pointer.matches(&data) {
            return Err(StoreError::Integrity {
                expected: pointer.to_hex(),
                actual: ContentPointer::of(&data).to_hex(),
            });
        }
        Ok(Bytes::from(data))
    }

    async fn has(&self, pointer: &ContentPointer) -> Result<bool> {
        let pointer = *pointer;
        with_conn(&self.conn, move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blobs WHERE pointer = ?1",
                    params![pointer.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

/// SQLite-backed key store. Records are stored CBOR-encoded.
#[derive(Clone)]
pub struct SqliteKeyStore {
    conn: SharedConn,
}

impl SqliteKeyStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: open_conn(path)?,
        })
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            conn: open_memory_conn()?,
        })
    }

    /// A key store on the same database as `blobs`.
    pub fn sharing(blobs: &SqliteContentStore) -> Self {
        Self {
            conn: blobs.conn.clone(),
        }
    }
}

fn encode_record(record: &KeyRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_record(bytes: &[u8]) -> Result<KeyRecord> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl LocalKeyStore for SqliteKeyStore {
    async fn load(&self, identity: &Identity) -> Result<Option<KeyRecord>> {
        let identity = *identity;
        let bytes: Option<Vec<u8>> = with_conn(&self.conn, move |conn| {
            conn.query_row(
                "SELECT record FROM local_keys WHERE identity = ?1",
                params![identity.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await?;

        match bytes {
            Some(bytes) => {
                let record = decode_record(&bytes)?;
                if record.identity != identity {
                    return Err(StoreError::InvalidData(format!(
                        "key record for {} stored under {}",
                        record.identity, identity
                    )));
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: &KeyRecord) -> Result<()> {
        let identity = record.identity;
        let stored_at = record.stored_at;
        let encoded = encode_record(record)?;

        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO local_keys (identity, record, stored_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(identity) DO UPDATE SET record = ?2, stored_at = ?3",
                params![identity.as_bytes().as_slice(), encoded, stored_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, identity: &Identity) -> Result<bool> {
        let identity = *identity;
        with_conn(&self.conn, move |conn| {
            let n = conn.execute(
                "DELETE FROM local_keys WHERE identity = ?1",
                params![identity.as_bytes().as_slice()],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Identity>> {
        with_conn(&self.conn, |conn| {
            let mut stmt = conn.prepare("SELECT identity FROM local_keys ORDER BY identity")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
            let mut identities = Vec::new();
            for row in rows {
                identities.push(identity_from_blob(row?)?);
            }
            Ok(identities)
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        with_conn(&self.conn, |conn| {
            conn.execute("DELETE FROM local_keys", [])?;
            Ok(())
        })
        .await
    }
}
