//! HTTP handlers
//!
//! Each handler runs the same pipeline: decode the body, validate the
//! decoded value, dispatch one storage operation, and let `HandlerError`
//! map any failure to a response. The whole pipeline runs inside a
//! [`request_scope`], so every log line it writes carries the request id.

pub mod blobs;
pub mod files;
pub mod orders;
pub mod products;

use actix_web::{web, HttpResponse, ResponseError};
use log::debug;
use std::future::Future;
use uuid::Uuid;

use crate::error::HandlerError;
use crate::log_context;

/// Registers every endpoint on the application
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(files::write_file)
        .service(orders::add_order)
        .service(blobs::upload_blob)
        .service(blobs::read_blob)
        .service(products::create_product)
        .service(products::list_products)
        .service(products::get_product)
        .service(products::update_product)
        .service(products::delete_product);
}

/// Runs one request pipeline under a fresh request id and turns its
/// failure into the error response.
pub(crate) async fn request_scope<F>(operation: &'static str, pipeline: F) -> HttpResponse
where
    F: Future<Output = Result<HttpResponse, HandlerError>>,
{
    let context = vec![
        ("request_id".to_string(), Uuid::new_v4().simple().to_string()),
        ("operation".to_string(), operation.to_string()),
    ];
    log_context::scoped(context, async move {
        debug!("Handling {}", operation);
        pipeline.await.unwrap_or_else(|e| e.error_response())
    })
    .await
}
