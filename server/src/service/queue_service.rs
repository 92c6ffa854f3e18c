//! Queue messages
//!
//! Messages are serialized to JSON and Base64 encoded before they are
//! handed to the queue, so consumers see one opaque text per message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::queue::{QueueReceipt, QueueStore};

pub struct QueueService {
    store: Arc<dyn QueueStore>,
}

/// JSON then Base64
pub fn encode_message<T: Serialize>(message: &T) -> Result<String, StorageError> {
    let json = serde_json::to_vec(message)?;
    Ok(STANDARD.encode(json))
}

pub fn decode_message<T: DeserializeOwned>(text: &str) -> Result<T, StorageError> {
    let json = STANDARD.decode(text).map_err(StorageError::backend)?;
    Ok(serde_json::from_slice(&json)?)
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    pub async fn enqueue_message<T: Serialize>(&self, queue: &str, message: &T) -> Result<QueueReceipt, StorageError> {
        let text = encode_message(message)?;
        self.store.ensure_queue(queue).await?;
        let receipt = self.store.send_message(queue, &text).await?;
        info!("Queued message {} on {}", receipt.message_id, queue);
        Ok(receipt)
    }
}
