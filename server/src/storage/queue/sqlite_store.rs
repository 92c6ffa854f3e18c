//! SQLite-backed queue

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::queue::{QueueReceipt, QueueStore};
use crate::storage::sqlite::{self, with_connection, SharedConnection};

/// Queue persisted in a SQLite database
pub struct SqliteQueueStore {
    conn: SharedConnection,
}

impl SqliteQueueStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(sqlite::open(db_path.as_ref())?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS queues (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS queue_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                queue_name TEXT NOT NULL REFERENCES queues(name),
                message_text TEXT NOT NULL,
                inserted_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Messages of a queue in send order, oldest first
    pub fn peek_messages(&self, queue: &str, max: usize) -> Result<Vec<String>, StorageError> {
        let conn = sqlite::lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT message_text FROM queue_messages WHERE queue_name = ?1 ORDER BY seq LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![queue, max as i64], |row| row.get::<_, String>(0))?;
        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn ensure_queue(&self, queue: &str) -> Result<(), StorageError> {
        let queue = queue.to_string();
        with_connection(&self.conn, move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO queues (name, created_at) VALUES (?1, ?2)",
                params![queue, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn send_message(&self, queue: &str, message_text: &str) -> Result<QueueReceipt, StorageError> {
        let queue = queue.to_string();
        let message_text = message_text.to_string();
        with_connection(&self.conn, move |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM queues WHERE name = ?1", params![queue], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Err(StorageError::NotFound(format!("queue {}", queue)));
            }

            let message_id = Uuid::new_v4().to_string();
            let inserted_on: DateTime<Utc> = Utc::now();
            conn.execute(
                "INSERT INTO queue_messages (message_id, queue_name, message_text, inserted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, queue, message_text, inserted_on.to_rfc3339()],
            )?;
            info!("Queued message {} on {}", message_id, queue);
            Ok(QueueReceipt { message_id, inserted_on })
        })
        .await
    }
}
