//! Payload decoding: raw request bodies into typed values
//!
//! Decoding failures are reported as [`DecodeError`] and are kept apart
//! from validation failures, which operate on already decoded values.

pub mod multipart;

use actix_web::web;
use bytes::{Bytes, BytesMut};
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::log_context;

pub use multipart::{extract_file, parse_boundary, UploadedFile};

/// Reads the whole request body, chunk by chunk, up to `limit` bytes.
pub async fn read_body(mut payload: web::Payload, limit: u64) -> Result<Bytes, DecodeError> {
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            warn!("Error reading payload chunk: {}", e);
            DecodeError::PayloadRead(e.to_string())
        })?;
        if (bytes.len() + chunk.len()) as u64 > limit {
            warn!("Payload exceeds limit of {} bytes", limit);
            return Err(DecodeError::PayloadTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    debug!("Total received data size: {} bytes", bytes.len());
    Ok(bytes.freeze())
}

// Chunks buffered between the connection and the multipart parser
const FORWARD_CAPACITY: usize = 8;

/// Forwards the request body, chunk by chunk, into a channel that a
/// `Send` consumer can own. Going past `limit` bytes or failing to read
/// ends the stream with that error as its last item. Forwarding stops as
/// soon as the receiver is dropped.
pub fn stream_body(mut payload: web::Payload, limit: u64) -> mpsc::Receiver<Result<Bytes, DecodeError>> {
    let (mut tx, rx) = mpsc::channel(FORWARD_CAPACITY);
    let forward = async move {
        let mut received = 0u64;
        while let Some(chunk) = payload.next().await {
            let item = match chunk {
                Ok(chunk) => {
                    received += chunk.len() as u64;
                    if received > limit {
                        warn!("Payload exceeds limit of {} bytes", limit);
                        Err(DecodeError::PayloadTooLarge)
                    } else {
                        Ok(chunk)
                    }
                }
                Err(e) => {
                    warn!("Error reading payload chunk: {}", e);
                    Err(DecodeError::PayloadRead(e.to_string()))
                }
            };
            let last = item.is_err();
            if tx.send(item).await.is_err() {
                debug!("Body consumer finished after {} bytes", received);
                return;
            }
            if last {
                return;
            }
        }
        debug!("Total forwarded data size: {} bytes", received);
    };
    actix_web::rt::spawn(log_context::scoped(log_context::current(), forward));
    rx
}

/// Parses a JSON body. An empty body or a JSON `null` is an absent value.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body).map_err(|e| DecodeError::MalformedJson(e.to_string()))
}

/// Reads a body as UTF-8 text. Empty text is a valid decode outcome.
pub fn decode_text(body: Bytes) -> Result<String, DecodeError> {
    String::from_utf8(body.to_vec()).map_err(|_| DecodeError::InvalidText)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Order;

    #[test]
    fn test_decode_json_absent_values() {
        assert_eq!(decode_json::<Order>(b"").unwrap(), None);
        assert_eq!(decode_json::<Order>(b"  \n").unwrap(), None);
        assert_eq!(decode_json::<Order>(b"null").unwrap(), None);
    }

    #[test]
    fn test_decode_json_malformed_is_decode_error() {
        let err = decode_json::<Order>(b"{\"RowKey\": ").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON payload:"));

        let wrong_type = decode_json::<Order>(br#"{"RowKey":"r1","Quantity":"three"}"#).unwrap_err();
        assert!(matches!(wrong_type, DecodeError::MalformedJson(_)));
    }

    #[test]
    fn test_decode_json_value() {
        let order = decode_json::<Order>(br#"{"RowKey":"r1","Quantity":2}"#).unwrap().unwrap();
        assert_eq!(order.row_key, "r1");
        assert_eq!(order.quantity, 2);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(Bytes::from_static(b"hello")).unwrap(), "hello");
        assert_eq!(decode_text(Bytes::new()).unwrap(), "");
        assert_eq!(decode_text(Bytes::from_static(&[0xff, 0xfe])).unwrap_err(), DecodeError::InvalidText);
    }

    async fn payload(body: &'static str) -> web::Payload {
        use actix_web::{test, FromRequest};

        let (req, mut pl) = test::TestRequest::default().set_payload(body).to_http_parts();
        web::Payload::from_request(&req, &mut pl).await.unwrap()
    }

    #[actix_web::test]
    async fn test_stream_body_forwards_everything() {
        let chunks: Vec<Result<Bytes, DecodeError>> = stream_body(payload("0123456789").await, 10).collect().await;
        let body: Vec<u8> = chunks.into_iter().flat_map(|c| c.unwrap().to_vec()).collect();
        assert_eq!(body, b"0123456789");
    }

    #[actix_web::test]
    async fn test_stream_body_ends_with_limit_error() {
        let chunks: Vec<Result<Bytes, DecodeError>> = stream_body(payload("0123456789").await, 5).collect().await;
        assert_eq!(chunks.last(), Some(&Err(DecodeError::PayloadTooLarge)));
    }

    #[actix_web::test]
    async fn test_read_body_enforces_limit() {
        assert_eq!(read_body(payload("0123456789").await, 5).await.unwrap_err(), DecodeError::PayloadTooLarge);
        assert_eq!(
            read_body(payload("0123456789").await, 10).await.unwrap(),
            Bytes::from_static(b"0123456789")
        );
    }
}
