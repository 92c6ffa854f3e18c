//! Multipart file uploads into the blob container, and anonymous reads of
//! public blobs at the URLs those uploads return

use actix_web::http::header::{CONTENT_TYPE, ETAG};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;

use crate::api::request_scope;
use crate::app_state::AppState;
use crate::decode::{extract_file, parse_boundary, stream_body};
use crate::error::HandlerError;
use crate::model::BlobObject;
use crate::validate::validate_upload;

#[post("/api/blobs")]
pub async fn upload_blob(req: HttpRequest, state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    request_scope("upload_blob", store_upload(req, state, payload)).await
}

async fn store_upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;

    // The boundary is checked before any of the body is read.
    let content_type = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let boundary = parse_boundary(content_type)?;

    let upload = &state.config.upload;
    let body = stream_body(payload, state.config.server.max_payload_size);
    let file = extract_file(body, &boundary, &upload.form_field, upload.max_file_bytes).await?;
    let file = validate_upload(file, upload)?;
    info!("Received file '{}' ({} bytes)", file.file_name, file.data.len());

    let blob = BlobObject::new(
        &state.config.resources.blob_container,
        &file.file_name,
        file.content_type,
        file.data,
    );
    let url = services
        .blobs
        .upload_blob(blob)
        .await
        .map_err(|e| HandlerError::storage("Blob", e))?;

    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(url))
}

#[get("/blobs/{container}/{name}")]
pub async fn read_blob(state: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (container, name) = path.into_inner();
    request_scope("read_blob", fetch_blob(state, container, name)).await
}

async fn fetch_blob(state: web::Data<AppState>, container: String, name: String) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;
    let blob = services
        .blobs
        .read_public_blob(&container, &name)
        .await
        .map_err(|e| HandlerError::storage("Blob", e))?;

    Ok(HttpResponse::Ok()
        .content_type(blob.content_type.unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()))
        .insert_header((ETAG, format!("\"{}\"", blob.content_md5)))
        .body(blob.data))
}
