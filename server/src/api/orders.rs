//! Orders placed on the processing queue

use actix_web::{post, web, HttpResponse};

use crate::api::request_scope;
use crate::app_state::AppState;
use crate::decode::{decode_json, read_body};
use crate::error::HandlerError;
use crate::model::Order;
use crate::validate::validate_order;

#[post("/api/orders")]
pub async fn add_order(state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    request_scope("add_order", enqueue_order(state, payload)).await
}

async fn enqueue_order(state: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse, HandlerError> {
    let services = state.services()?;

    let body = read_body(payload, state.config.server.max_payload_size).await?;
    let order = validate_order(decode_json::<Order>(&body)?)?;

    services
        .queues
        .enqueue_message(&state.config.resources.queue_name, &order)
        .await
        .map_err(|e| HandlerError::storage("Order", e))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Order added to the queue."))
}
