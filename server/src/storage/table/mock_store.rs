//! In-memory keyed tables for tests

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use log::info;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;
use crate::model::Record;
use crate::storage::table::{new_etag, version_matches, TableStore, UpdateMode};

type Table = BTreeMap<(String, String), Record>;

/// Mock implementation of TableStore for testing
#[derive(Default)]
pub struct MockTableStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MockTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::backend("mock table lock poisoned"))
    }

    pub fn record_count(&self, table: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|t| t.get(table).map(BTreeMap::len))
            .unwrap_or(0)
    }
}

fn table_mut<'a>(tables: &'a mut HashMap<String, Table>, table: &str) -> Result<&'a mut Table, StorageError> {
    tables
        .get_mut(table)
        .ok_or_else(|| StorageError::NotFound(format!("table {}", table)))
}

#[async_trait]
impl TableStore for MockTableStore {
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        self.lock()?.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, StorageError> {
        let mut tables = self.lock()?;
        let rows = table_mut(&mut tables, table)?;
        let key = (record.partition_key.clone(), record.row_key.clone());
        if rows.contains_key(&key) {
            return Err(StorageError::Conflict(record.identity(table)));
        }
        record.etag = Some(new_etag(&record));
        record.timestamp = Some(Utc::now());
        rows.insert(key, record.clone());
        info!("Mock: Inserted {}", record.identity(table));
        Ok(record)
    }

    async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Record, StorageError> {
        let tables = self.lock()?;
        tables
            .get(table)
            .and_then(|rows| rows.get(&(partition_key.to_string(), row_key.to_string())))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}/{}", table, partition_key, row_key)))
    }

    async fn update(&self, table: &str, mut record: Record, version: &str, mode: UpdateMode) -> Result<Record, StorageError> {
        let mut tables = self.lock()?;
        let rows = table_mut(&mut tables, table)?;
        let key = (record.partition_key.clone(), record.row_key.clone());
        let stored = rows
            .get_mut(&key)
            .ok_or_else(|| StorageError::NotFound(record.identity(table)))?;
        if !version_matches(stored.etag.as_deref().unwrap_or_default(), version) {
            return Err(StorageError::Conflict(format!("{} version {}", record.identity(table), version)));
        }
        if mode == UpdateMode::Merge {
            let mut merged = stored.fields.clone();
            merged.append(&mut record.fields);
            record.fields = merged;
        }
        record.etag = Some(new_etag(&record));
        record.timestamp = Some(Utc::now());
        *stored = record.clone();
        info!("Mock: Updated {} ({:?})", record.identity(table), mode);
        Ok(record)
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        let rows = table_mut(&mut tables, table)?;
        rows.remove(&(partition_key.to_string(), row_key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}/{}", table, partition_key, row_key)))
    }

    fn scan(&self, table: &str) -> BoxStream<'static, Result<Record, StorageError>> {
        let snapshot: Vec<Result<Record, StorageError>> = match self.lock() {
            Ok(tables) => match tables.get(table) {
                Some(rows) => rows.values().cloned().map(Ok).collect(),
                None => vec![Err(StorageError::NotFound(format!("table {}", table)))],
            },
            Err(e) => vec![Err(e)],
        };
        stream::iter(snapshot).boxed()
    }
}
