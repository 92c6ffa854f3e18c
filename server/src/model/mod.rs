//! Entities that flow from the decoders to the storage backends

pub mod artifact;
pub mod order;
pub mod product;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use artifact::{BlobObject, TextArtifact};
pub use order::Order;
pub use product::Product;

/// Scalar value stored in a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Double(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Generic keyed entity as the table backends see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub partition_key: String,
    pub row_key: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Version token for optimistic concurrency, assigned by the backend
    pub etag: Option<String>,
    /// Last write time, assigned by the backend
    pub timestamp: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            fields: BTreeMap::new(),
            etag: None,
            timestamp: None,
        }
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// `table/partition/row`, used in log lines and error detail
    pub fn identity(&self, table: &str) -> String {
        format!("{}/{}/{}", table, self.partition_key, self.row_key)
    }
}

/// A typed entity stored as a [`Record`] under a fixed partition.
pub trait TableEntity: Sized {
    /// Partition every entity of this kind is stored under
    const PARTITION: &'static str;
    /// Name used in responses, e.g. "Product not found."
    const NAME: &'static str;

    fn row_key(&self) -> &str;
    fn set_row_key(&mut self, row_key: String);
    fn to_record(&self) -> Record;
    fn from_record(record: Record) -> Self;
    /// Copy every mutable field of `incoming` onto `self`. Keys and the
    /// version token are left alone.
    fn overlay(&mut self, incoming: Self);
}
