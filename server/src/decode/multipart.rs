//! multipart/form-data decoding
//!
//! Sections are walked strictly in order with `multer` straight off the
//! body stream. Sections that do not qualify are drained and dropped; only
//! the first qualifying section is collected, and only up to one byte past
//! the upload size limit.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use log::{debug, info, warn};

use crate::error::DecodeError;

/// The file section selected from a multipart body
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Checks the declared content type and returns its boundary.
///
/// A missing header, a type other than `multipart/form-data`, and a missing
/// boundary are reported as different errors. Once the type itself matches,
/// any defect in the parameters is a boundary problem.
pub fn parse_boundary(content_type: Option<&str>) -> Result<String, DecodeError> {
    let content_type = content_type.ok_or(DecodeError::MissingContentType)?;
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return Err(DecodeError::NotMultipart);
    }
    let mime: mime::Mime = content_type.parse().map_err(|_| DecodeError::MissingBoundary)?;
    match mime.get_param(mime::BOUNDARY) {
        Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_string()),
        _ => Err(DecodeError::MissingBoundary),
    }
}

/// True when a Content-Disposition value has the `form-data` type.
fn is_form_data(disposition: Option<&str>) -> bool {
    disposition
        .and_then(|value| value.split(';').next())
        .map(|kind| kind.trim().eq_ignore_ascii_case("form-data"))
        .unwrap_or(false)
}

/// Errors raised by the body stream come back out of `multer` boxed.
fn multipart_error(err: multer::Error) -> DecodeError {
    match err {
        multer::Error::StreamReadFailed(source) => match source.downcast::<DecodeError>() {
            Ok(decode) => *decode,
            Err(source) => DecodeError::PayloadRead(source.to_string()),
        },
        other => DecodeError::MalformedMultipart(other.to_string()),
    }
}

/// Returns the first section whose disposition is `form-data`, whose field
/// name equals `field` ignoring case, and whose file name is non-empty.
///
/// Reading stops once the section holds more than `max_bytes`, so an
/// oversized file is handed on just large enough to be rejected.
pub async fn extract_file<S>(body: S, boundary: &str, field: &str, max_bytes: u64) -> Result<UploadedFile, DecodeError>
where
    S: Stream<Item = Result<Bytes, DecodeError>> + Send,
{
    let mut multipart = multer::Multipart::new(body, boundary);

    let mut index = 0usize;
    while let Some(mut section) = multipart.next_field().await.map_err(multipart_error)? {
        let disposition = section
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok());
        let field_name = section.name().unwrap_or_default().to_string();
        let file_name = section.file_name().unwrap_or_default().to_string();

        if !is_form_data(disposition)
            || !field_name.eq_ignore_ascii_case(field)
            || file_name.is_empty()
        {
            debug!("Skipping multipart section {} (field '{}')", index, field_name);
            index += 1;
            continue;
        }

        let content_type = section.content_type().map(|m| m.to_string());
        let mut data = BytesMut::new();
        while let Some(chunk) = section.chunk().await.map_err(multipart_error)? {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > max_bytes {
                warn!("File '{}' exceeds {} bytes, not reading further", file_name, max_bytes);
                break;
            }
        }
        info!(
            "Selected multipart section {} (field '{}', file '{}', {} bytes)",
            index,
            field_name,
            file_name,
            data.len()
        );
        return Ok(UploadedFile {
            field_name,
            file_name,
            content_type,
            data: data.freeze(),
        });
    }

    Err(DecodeError::NoFileFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";
    const NO_LIMIT: u64 = u64::MAX;

    fn section(disposition: &str, content_type: Option<&str>, data: &str) -> String {
        let mut part = format!("--{}\r\nContent-Disposition: {}\r\n", BOUNDARY, disposition);
        if let Some(ct) = content_type {
            part.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        part.push_str("\r\n");
        part.push_str(data);
        part.push_str("\r\n");
        part
    }

    fn body(sections: &[String]) -> Bytes {
        let mut body = sections.concat();
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Bytes::from(body)
    }

    fn whole(body: Bytes) -> impl Stream<Item = Result<Bytes, DecodeError>> + Send {
        stream::iter(vec![Ok(body)])
    }

    /// The body split into `size`-byte chunks, as it arrives off the wire
    fn chunked(body: Bytes, size: usize) -> impl Stream<Item = Result<Bytes, DecodeError>> + Send {
        let chunks: Vec<Result<Bytes, DecodeError>> = body
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks)
    }

    #[test]
    fn test_parse_boundary_errors_are_distinct() {
        assert_eq!(parse_boundary(None), Err(DecodeError::MissingContentType));
        assert_eq!(parse_boundary(Some("application/json")), Err(DecodeError::NotMultipart));
        assert_eq!(parse_boundary(Some("multipart/mixed; boundary=abc")), Err(DecodeError::NotMultipart));
        assert_eq!(parse_boundary(Some("multipart/form-data")), Err(DecodeError::MissingBoundary));
        assert_eq!(parse_boundary(Some("multipart/form-data; boundary")), Err(DecodeError::MissingBoundary));
        assert_eq!(
            parse_boundary(Some("multipart/form-data; boundary=\"\"")),
            Err(DecodeError::MissingBoundary)
        );
        assert_eq!(parse_boundary(Some("multipart/form-data;")), Err(DecodeError::MissingBoundary));
        assert_eq!(parse_boundary(Some("text/plain; boundary")), Err(DecodeError::NotMultipart));
        assert_eq!(
            parse_boundary(Some("multipart/form-data; boundary=abc123")),
            Ok("abc123".to_string())
        );
        assert_eq!(
            parse_boundary(Some("Multipart/Form-Data; boundary=\"quoted\"")),
            Ok("quoted".to_string())
        );
    }

    #[test]
    fn test_disposition_type() {
        assert!(is_form_data(Some("form-data; name=\"file\"")));
        assert!(is_form_data(Some(" Form-Data ; name=\"file\"")));
        assert!(!is_form_data(Some("attachment; name=\"file\"")));
        assert!(!is_form_data(None));
    }

    #[actix_web::test]
    async fn test_extracts_matching_file() {
        let body = body(&[
            section("form-data; name=\"description\"", None, "just text"),
            section("form-data; name=\"file\"; filename=\"a.png\"", Some("image/png"), "PNGDATA"),
        ]);
        let file = extract_file(whole(body), BOUNDARY, "file", NO_LIMIT).await.unwrap();
        assert_eq!(file.field_name, "file");
        assert_eq!(file.file_name, "a.png");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data, Bytes::from_static(b"PNGDATA"));
    }

    #[actix_web::test]
    async fn test_field_name_match_ignores_case() {
        let body = body(&[section("form-data; name=\"FILE\"; filename=\"b.txt\"", None, "abc")]);
        let file = extract_file(whole(body), BOUNDARY, "file", NO_LIMIT).await.unwrap();
        assert_eq!(file.file_name, "b.txt");
        assert_eq!(file.content_type, None);
    }

    #[actix_web::test]
    async fn test_first_qualifying_section_wins() {
        let body = body(&[
            section("form-data; name=\"file\"", None, "no file name"),
            section("form-data; name=\"file\"; filename=\"first.txt\"", None, "one"),
            section("form-data; name=\"file\"; filename=\"second.txt\"", None, "two"),
        ]);
        let file = extract_file(whole(body), BOUNDARY, "file", NO_LIMIT).await.unwrap();
        assert_eq!(file.file_name, "first.txt");
        assert_eq!(file.data, Bytes::from_static(b"one"));
    }

    #[actix_web::test]
    async fn test_no_matching_section() {
        let body = body(&[
            section("form-data; name=\"image\"; filename=\"a.png\"", None, "x"),
            section("form-data; name=\"file\"; filename=\"\"", None, "y"),
        ]);
        assert_eq!(extract_file(whole(body), BOUNDARY, "file", NO_LIMIT).await, Err(DecodeError::NoFileFound));
    }

    #[actix_web::test]
    async fn test_section_split_across_chunks() {
        let body = body(&[
            section("form-data; name=\"note\"", None, &"n".repeat(100)),
            section("form-data; name=\"file\"; filename=\"c.bin\"", None, &"0123456789".repeat(20)),
        ]);
        let file = extract_file(chunked(body, 7), BOUNDARY, "file", NO_LIMIT).await.unwrap();
        assert_eq!(file.file_name, "c.bin");
        assert_eq!(file.data, Bytes::from("0123456789".repeat(20)));
    }

    #[actix_web::test]
    async fn test_oversized_section_stops_past_limit() {
        let body = body(&[section("form-data; name=\"file\"; filename=\"big.txt\"", None, &"x".repeat(4096))]);
        let file = extract_file(chunked(body, 64), BOUNDARY, "file", 100).await.unwrap();
        assert!(file.data.len() > 100);
        assert!(file.data.len() < 4096);
    }

    #[actix_web::test]
    async fn test_body_stream_error_is_passed_through() {
        let opening = Bytes::from(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\npartial",
            BOUNDARY
        ));
        let body = stream::iter(vec![Ok(opening), Err(DecodeError::PayloadTooLarge)]);
        assert_eq!(
            extract_file(body, BOUNDARY, "file", NO_LIMIT).await,
            Err(DecodeError::PayloadTooLarge)
        );
    }

    #[actix_web::test]
    async fn test_truncated_body_is_malformed() {
        let body = Bytes::from(format!("--{}\r\nContent-Disposition: form-data; name=\"file\"", BOUNDARY));
        assert!(matches!(
            extract_file(whole(body), BOUNDARY, "file", NO_LIMIT).await,
            Err(DecodeError::MalformedMultipart(_))
        ));
    }
}
