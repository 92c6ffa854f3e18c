//! Product catalogue entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{FieldValue, Record, TableEntity};

/// Product as exchanged over HTTP. Keys follow the table service naming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Product {
    #[serde(deserialize_with = "null_as_empty")]
    pub partition_key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub row_key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

// A JSON null reads the same as a missing value and is left to validation.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

const PRODUCT_NAME: &str = "ProductName";
const DESCRIPTION: &str = "Description";
const PRICE: &str = "Price";
const STOCK_QUANTITY: &str = "StockQuantity";
const IMAGE_URL: &str = "ImageUrl";

impl TableEntity for Product {
    const PARTITION: &'static str = "Product";
    const NAME: &'static str = "Product";

    fn row_key(&self) -> &str {
        &self.row_key
    }

    fn set_row_key(&mut self, row_key: String) {
        self.row_key = row_key;
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(Self::PARTITION, self.row_key.clone())
            .with_field(PRODUCT_NAME, FieldValue::Text(self.product_name.clone()));
        if let Some(description) = &self.description {
            record.fields.insert(DESCRIPTION.to_string(), FieldValue::Text(description.clone()));
        }
        if let Some(price) = self.price {
            record.fields.insert(PRICE.to_string(), FieldValue::Double(price));
        }
        if let Some(quantity) = self.stock_quantity {
            record.fields.insert(STOCK_QUANTITY.to_string(), FieldValue::Int(quantity));
        }
        if let Some(url) = &self.image_url {
            record.fields.insert(IMAGE_URL.to_string(), FieldValue::Text(url.clone()));
        }
        record.etag = self.etag.clone();
        record.timestamp = self.timestamp;
        record
    }

    fn from_record(record: Record) -> Self {
        let text = |name: &str| record.fields.get(name).and_then(FieldValue::as_str).map(str::to_string);
        Self {
            product_name: text(PRODUCT_NAME).unwrap_or_default(),
            description: text(DESCRIPTION),
            price: record.fields.get(PRICE).and_then(FieldValue::as_f64),
            stock_quantity: record.fields.get(STOCK_QUANTITY).and_then(FieldValue::as_i64),
            image_url: text(IMAGE_URL),
            partition_key: record.partition_key,
            row_key: record.row_key,
            timestamp: record.timestamp,
            etag: record.etag,
        }
    }

    fn overlay(&mut self, incoming: Self) {
        self.product_name = incoming.product_name;
        self.description = incoming.description;
        self.price = incoming.price;
        self.stock_quantity = incoming.stock_quantity;
        self.image_url = incoming.image_url;
    }
}
