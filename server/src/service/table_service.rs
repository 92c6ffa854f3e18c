//! Typed CRUD over the keyed table backend
//!
//! Every entity kind lives under its fixed partition (`TableEntity::PARTITION`).
//! Creates never overwrite, updates never create, and updates are guarded
//! by the version token read just before the write.

use futures::stream::{BoxStream, StreamExt};
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StorageError;
use crate::model::TableEntity;
use crate::storage::table::{TableStore, UpdateMode};

pub struct TableService {
    store: Arc<dyn TableStore>,
}

impl TableService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Insert a new entity. A blank row key is replaced by a fresh UUID;
    /// a caller supplied one is kept as is.
    pub async fn create<E: TableEntity>(&self, table: &str, mut entity: E) -> Result<E, StorageError> {
        self.store.ensure_table(table).await?;
        if entity.row_key().trim().is_empty() {
            entity.set_row_key(Uuid::new_v4().to_string());
        }
        let mut record = entity.to_record();
        record.partition_key = E::PARTITION.to_string();
        let stored = self.store.insert(table, record).await?;
        info!("Created {}", stored.identity(table));
        Ok(E::from_record(stored))
    }

    pub async fn read<E: TableEntity>(&self, table: &str, row_key: &str) -> Result<E, StorageError> {
        let record = self.store.get(table, E::PARTITION, row_key).await?;
        Ok(E::from_record(record))
    }

    /// Fresh lazy scan of every entity in the table
    pub async fn read_all<E>(&self, table: &str) -> Result<BoxStream<'static, Result<E, StorageError>>, StorageError>
    where
        E: TableEntity + Send + 'static,
    {
        self.store.ensure_table(table).await?;
        debug!("Scanning table {}", table);
        Ok(self
            .store
            .scan(table)
            .map(|record| record.map(E::from_record))
            .boxed())
    }

    /// Overlay the mutable fields of `incoming` onto the stored entity.
    pub async fn update<E: TableEntity>(&self, table: &str, row_key: &str, incoming: E) -> Result<E, StorageError> {
        let mut entity = E::from_record(self.store.get(table, E::PARTITION, row_key).await?);
        entity.overlay(incoming);

        let record = entity.to_record();
        let version = record.etag.clone().unwrap_or_default();
        let stored = self.store.update(table, record, &version, UpdateMode::Replace).await?;
        info!("Updated {}", stored.identity(table));
        Ok(E::from_record(stored))
    }

    pub async fn delete<E: TableEntity>(&self, table: &str, row_key: &str) -> Result<(), StorageError> {
        self.store.delete(table, E::PARTITION, row_key).await?;
        info!("Deleted {}/{}/{}", table, E::PARTITION, row_key);
        Ok(())
    }
}
