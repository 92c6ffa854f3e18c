//! Product catalogue CRUD over the keyed table

use actix_web::{delete, get, post, put, web, HttpResponse};
use futures::TryStreamExt;
use log::info;

use crate::api::request_scope;
use crate::app_state::AppState;
use crate::decode::{decode_json, read_body};
use crate::error::{HandlerError, StorageError};
use crate::model::{Product, TableEntity};
use crate::validate::{validate_product, validate_row_key};

fn storage_error(err: StorageError) -> HandlerError {
    HandlerError::storage(Product::NAME, err)
}

#[post("/api/products")]
pub async fn create_product(state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    request_scope("create_product", insert_product(state, payload)).await
}

async fn insert_product(state: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;

    let body = read_body(payload, state.config.server.max_payload_size).await?;
    let product = validate_product(decode_json::<Product>(&body)?)?;

    let created = services
        .tables
        .create(&state.config.resources.table_name, product)
        .await
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(created))
}

#[get("/api/products")]
pub async fn list_products(state: web::Data<AppState>) -> HttpResponse {
    request_scope("list_products", collect_products(state)).await
}

async fn collect_products(state: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;

    let products: Vec<Product> = services
        .tables
        .read_all(&state.config.resources.table_name)
        .await
        .map_err(storage_error)?
        .try_collect()
        .await
        .map_err(storage_error)?;
    info!("Listed {} products", products.len());
    Ok(HttpResponse::Ok().json(products))
}

#[get("/api/products/{id}")]
pub async fn get_product(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    request_scope("get_product", fetch_product(state, path.into_inner())).await
}

async fn fetch_product(state: web::Data<AppState>, id: String) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;
    let row_key = validate_row_key(&id)?;

    let product: Product = services
        .tables
        .read(&state.config.resources.table_name, row_key)
        .await
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(product))
}

#[put("/api/products/{id}")]
pub async fn update_product(state: web::Data<AppState>, path: web::Path<String>, payload: web::Payload) -> HttpResponse {
    request_scope("update_product", replace_product(state, path.into_inner(), payload)).await
}

async fn replace_product(
    state: web::Data<AppState>,
    id: String,
    payload: web::Payload,
) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;
    let row_key = validate_row_key(&id)?;

    let body = read_body(payload, state.config.server.max_payload_size).await?;
    let incoming = validate_product(decode_json::<Product>(&body)?)?;

    let updated = services
        .tables
        .update(&state.config.resources.table_name, row_key, incoming)
        .await
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/api/products/{id}")]
pub async fn delete_product(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    request_scope("delete_product", remove_product(state, path.into_inner())).await
}

async fn remove_product(state: web::Data<AppState>, id: String) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;
    let row_key = validate_row_key(&id)?;

    services
        .tables
        .delete::<Product>(&state.config.resources.table_name, row_key)
        .await
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Product deleted successfully."))
}
