//! Queue backend abstraction

pub mod mock_store;
pub mod sqlite_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Acknowledgement returned by a successful send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueReceipt {
    pub message_id: String,
    pub inserted_on: DateTime<Utc>,
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create the queue if it does not exist yet
    async fn ensure_queue(&self, queue: &str) -> Result<(), StorageError>;

    /// Append an opaque message to an existing queue
    async fn send_message(&self, queue: &str, message_text: &str) -> Result<QueueReceipt, StorageError>;
}
