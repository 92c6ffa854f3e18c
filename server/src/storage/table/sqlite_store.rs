//! SQLite implementation of TableStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;
use crate::model::{FieldValue, Record};
use crate::storage::sqlite::{self, with_connection, SharedConnection};
use crate::storage::table::{new_etag, version_matches, TableStore, UpdateMode};

/// Rows fetched per round trip while scanning
const SCAN_PAGE_SIZE: usize = 100;

/// Keyed tables persisted in one SQLite database
pub struct SqliteTableStore {
    conn: SharedConnection,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StorageError> {
    Ok(conn
        .query_row("SELECT 1 FROM table_names WHERE name = ?1", params![table], |_| Ok(()))
        .optional()?
        .is_some())
}

fn require_table(conn: &Connection, table: &str) -> Result<(), StorageError> {
    if table_exists(conn, table)? {
        Ok(())
    } else {
        Err(StorageError::NotFound(format!("table {}", table)))
    }
}

// Columns: partition_key, row_key, fields, etag, timestamp
fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_record(raw: (String, String, String, String, String)) -> Result<Record, StorageError> {
    let (partition_key, row_key, fields, etag, timestamp) = raw;
    let fields: BTreeMap<String, FieldValue> = serde_json::from_str(&fields)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(StorageError::backend)?
        .with_timezone(&Utc);
    Ok(Record {
        partition_key,
        row_key,
        fields,
        etag: Some(etag),
        timestamp: Some(timestamp),
    })
}

fn fetch_record(conn: &Connection, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Record>, StorageError> {
    let raw = conn
        .query_row(
            "SELECT partition_key, row_key, fields, etag, timestamp FROM entities
             WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
            params![table, partition_key, row_key],
            record_from_row,
        )
        .optional()?;
    raw.map(into_record).transpose()
}

/// One page of a scan, ordered by key, strictly after `after` when given
fn fetch_page(conn: &Connection, table: &str, after: Option<&(String, String)>) -> Result<Vec<Record>, StorageError> {
    let raws = match after {
        None => {
            require_table(conn, table)?;
            let mut stmt = conn.prepare(
                "SELECT partition_key, row_key, fields, etag, timestamp FROM entities
                 WHERE table_name = ?1
                 ORDER BY partition_key, row_key LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![table, SCAN_PAGE_SIZE as i64], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        Some((partition_key, row_key)) => {
            let mut stmt = conn.prepare(
                "SELECT partition_key, row_key, fields, etag, timestamp FROM entities
                 WHERE table_name = ?1 AND (partition_key, row_key) > (?2, ?3)
                 ORDER BY partition_key, row_key LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                params![table, partition_key, row_key, SCAN_PAGE_SIZE as i64],
                record_from_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    raws.into_iter().map(into_record).collect()
}

enum ScanCursor {
    Start,
    After(String, String),
    Done,
}

impl SqliteTableStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = sqlite::open(db_path.as_ref())?;
        info!("Opened table database at {}", db_path.as_ref().display());
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS table_names (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entities (
                table_name TEXT NOT NULL,
                partition_key TEXT NOT NULL,
                row_key TEXT NOT NULL,
                fields TEXT NOT NULL,
                etag TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (table_name, partition_key, row_key)
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl TableStore for SqliteTableStore {
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        let table = table.to_string();
        with_connection(&self.conn, move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO table_names (name, created_at) VALUES (?1, ?2)",
                params![table, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, StorageError> {
        let table = table.to_string();
        with_connection(&self.conn, move |conn| {
            require_table(conn, &table)?;
            let now = Utc::now();
            let etag = new_etag(&record);
            let result = conn.execute(
                "INSERT INTO entities (table_name, partition_key, row_key, fields, etag, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    table,
                    record.partition_key,
                    record.row_key,
                    serde_json::to_string(&record.fields)?,
                    etag,
                    now.to_rfc3339()
                ],
            );
            match result {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(StorageError::Conflict(record.identity(&table))),
                Err(e) => return Err(e.into()),
            }
            record.etag = Some(etag);
            record.timestamp = Some(now);
            debug!("Inserted {}", record.identity(&table));
            Ok(record)
        })
        .await
    }

    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Record, StorageError> {
        let (table, partition_key, row_key) = (table.to_string(), partition_key.to_string(), row_key.to_string());
        with_connection(&self.conn, move |conn| {
            fetch_record(conn, &table, &partition_key, &row_key)?
                .ok_or_else(|| StorageError::NotFound(format!("{}/{}/{}", table, partition_key, row_key)))
        })
        .await
    }

    async fn update(&self, table: &str, mut record: Record, version: &str, mode: UpdateMode) -> Result<Record, StorageError> {
        let (table, version) = (table.to_string(), version.to_string());
        with_connection(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            let stored = fetch_record(&tx, &table, &record.partition_key, &record.row_key)?
                .ok_or_else(|| StorageError::NotFound(record.identity(&table)))?;
            let stored_etag = stored.etag.unwrap_or_default();
            if !version_matches(&stored_etag, &version) {
                return Err(StorageError::Conflict(format!("{} version {}", record.identity(&table), version)));
            }
            if mode == UpdateMode::Merge {
                let mut merged = stored.fields;
                merged.append(&mut record.fields);
                record.fields = merged;
            }

            let now = Utc::now();
            let etag = new_etag(&record);
            let changed = tx.execute(
                "UPDATE entities SET fields = ?1, etag = ?2, timestamp = ?3
                 WHERE table_name = ?4 AND partition_key = ?5 AND row_key = ?6 AND etag = ?7",
                params![
                    serde_json::to_string(&record.fields)?,
                    etag,
                    now.to_rfc3339(),
                    table,
                    record.partition_key,
                    record.row_key,
                    stored_etag
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::Conflict(record.identity(&table)));
            }
            tx.commit()?;

            record.etag = Some(etag);
            record.timestamp = Some(now);
            debug!("Updated {} ({:?})", record.identity(&table), mode);
            Ok(record)
        })
        .await
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StorageError> {
        let (table, partition_key, row_key) = (table.to_string(), partition_key.to_string(), row_key.to_string());
        with_connection(&self.conn, move |conn| {
            let deleted = conn.execute(
                "DELETE FROM entities WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
                params![table, partition_key, row_key],
            )?;
            if deleted == 0 {
                return Err(StorageError::NotFound(format!("{}/{}/{}", table, partition_key, row_key)));
            }
            Ok(())
        })
        .await
    }

    fn scan(&self, table: &str) -> BoxStream<'static, Result<Record, StorageError>> {
        let conn = Arc::clone(&self.conn);
        let table = table.to_string();
        stream::unfold(ScanCursor::Start, move |cursor| {
            let conn = Arc::clone(&conn);
            let table = table.clone();
            async move {
                let after = match cursor {
                    ScanCursor::Done => return None,
                    ScanCursor::Start => None,
                    ScanCursor::After(partition_key, row_key) => Some((partition_key, row_key)),
                };
                let page = with_connection(&conn, move |conn| fetch_page(conn, &table, after.as_ref())).await;
                match page {
                    Ok(page) => {
                        let next = match page.last() {
                            Some(last) if page.len() == SCAN_PAGE_SIZE => {
                                ScanCursor::After(last.partition_key.clone(), last.row_key.clone())
                            }
                            _ => ScanCursor::Done,
                        };
                        let items: Vec<Result<Record, StorageError>> = page.into_iter().map(Ok).collect();
                        Some((items, next))
                    }
                    Err(e) => Some((vec![Err(e)], ScanCursor::Done)),
                }
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }
}
