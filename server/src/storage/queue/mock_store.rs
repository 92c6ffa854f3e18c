//! In-memory queue for tests

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::queue::{QueueReceipt, QueueStore};

/// Mock implementation of QueueStore for testing
#[derive(Default)]
pub struct MockQueueStore {
    queues: Mutex<HashMap<String, Vec<String>>>,
}

impl MockQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<String>>>, StorageError> {
        self.queues
            .lock()
            .map_err(|_| StorageError::backend("mock queue lock poisoned"))
    }

    pub fn queue_exists(&self, queue: &str) -> bool {
        self.lock().map(|q| q.contains_key(queue)).unwrap_or(false)
    }

    /// Messages in send order
    pub fn messages(&self, queue: &str) -> Vec<String> {
        self.lock()
            .ok()
            .and_then(|q| q.get(queue).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueueStore for MockQueueStore {
    async fn ensure_queue(&self, queue: &str) -> Result<(), StorageError> {
        self.lock()?.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn send_message(&self, queue: &str, message_text: &str) -> Result<QueueReceipt, StorageError> {
        let mut queues = self.lock()?;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::NotFound(format!("queue {}", queue)))?;
        messages.push(message_text.to_string());
        info!("Mock: Queued message #{} on {}", messages.len(), queue);
        Ok(QueueReceipt {
            message_id: Uuid::new_v4().to_string(),
            inserted_on: Utc::now(),
        })
    }
}
