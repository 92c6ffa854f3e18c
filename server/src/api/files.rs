//! Raw text bodies written as new files on the share

use actix_web::{post, web, HttpResponse};
use chrono::Utc;

use crate::api::request_scope;
use crate::app_state::AppState;
use crate::decode::{decode_text, read_body};
use crate::error::HandlerError;
use crate::model::TextArtifact;
use crate::validate::validate_text;

#[post("/api/files")]
pub async fn write_file(state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    request_scope("write_file", write_text_artifact(state, payload)).await
}

async fn write_text_artifact(state: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;

    let body = read_body(payload, state.config.server.max_payload_size).await?;
    let content = validate_text(decode_text(body)?)?;

    let resources = &state.config.resources;
    let artifact = TextArtifact::new(&resources.file_share, &resources.file_directory, content, Utc::now());
    let path = services
        .files
        .append_text_artifact(&artifact)
        .await
        .map_err(|e| HandlerError::storage("File", e))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(format!("File written successfully: {}", path)))
}
