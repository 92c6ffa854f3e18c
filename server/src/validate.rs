//! Per-entity validation rules. Rules run in order; the first failure wins.

use log::warn;

use crate::config::UploadConfig;
use crate::decode::UploadedFile;
use crate::error::ValidationError;
use crate::model::{Order, Product};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn validate_product(product: Option<Product>) -> Result<Product, ValidationError> {
    match product {
        Some(product) if !is_blank(&product.product_name) => Ok(product),
        _ => {
            warn!("Rejected product: missing value or empty product name");
            Err(ValidationError::InvalidProduct)
        }
    }
}

/// Row keys taken from the request path
pub fn validate_row_key(row_key: &str) -> Result<&str, ValidationError> {
    if is_blank(row_key) {
        return Err(ValidationError::InvalidRowKey);
    }
    Ok(row_key)
}

pub fn validate_order(order: Option<Order>) -> Result<Order, ValidationError> {
    let order = order.ok_or(ValidationError::InvalidOrder)?;
    if is_blank(&order.row_key) {
        warn!("Rejected order: empty row key");
        return Err(ValidationError::InvalidOrder);
    }
    if order.quantity <= 0 {
        warn!("Rejected order {}: quantity {}", order.row_key, order.quantity);
        return Err(ValidationError::InvalidOrder);
    }
    Ok(order)
}

pub fn validate_text(text: String) -> Result<String, ValidationError> {
    if is_blank(&text) {
        return Err(ValidationError::EmptyText);
    }
    Ok(text)
}

/// Size and content-type checks for an uploaded file. An empty allowlist
/// accepts every content type.
pub fn validate_upload(file: UploadedFile, rules: &UploadConfig) -> Result<UploadedFile, ValidationError> {
    if file.data.len() as u64 > rules.max_file_bytes {
        warn!(
            "Rejected upload '{}': {} bytes over limit {}",
            file.file_name,
            file.data.len(),
            rules.max_file_bytes
        );
        return Err(ValidationError::FileTooLarge);
    }
    if !rules.allowed_content_types.is_empty() {
        let essence = file
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        let allowed = essence
            .map(|ct| rules.allowed_content_types.iter().any(|a| a.eq_ignore_ascii_case(&ct)))
            .unwrap_or(false);
        if !allowed {
            warn!("Rejected upload '{}': content type {:?}", file.file_name, file.content_type);
            return Err(ValidationError::FileTypeNotAllowed);
        }
    }
    Ok(file)
}
