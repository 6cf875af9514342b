//! Request construction: URL resolution and body encoding.
//!
//! # Design
//! The body shape is chosen from an explicit [`Payload`] rather than by
//! comparing a value against its type's default, so an intentionally empty
//! JSON value (`{}`, `[]`, `0`) is still sent. Encoding errors are returned,
//! not reported; the facade owns reporting.

use bytes::Bytes;
use serde::Serialize;

use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest};

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// The body to send with a request.
#[derive(Debug)]
pub enum Payload<'a, B: ?Sized = ()> {
    /// No body and no content-type header.
    Empty,
    /// Raw bytes sent as `application/octet-stream`.
    Binary(Bytes),
    /// A value serialized to UTF-8 JSON.
    Json(&'a B),
}

impl Payload<'_, ()> {
    pub fn empty() -> Self {
        Payload::Empty
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Payload::Binary(bytes.into())
    }
}

impl<'a, B: ?Sized> Payload<'a, B> {
    pub fn json(value: &'a B) -> Self {
        Payload::Json(value)
    }
}

impl<'a, B: ?Sized> From<Option<&'a B>> for Payload<'a, B> {
    fn from(value: Option<&'a B>) -> Self {
        match value {
            Some(value) => Payload::Json(value),
            None => Payload::Empty,
        }
    }
}

/// Build the outbound request for `method` + `url`, encoding `payload`.
pub fn build_request<B>(
    method: HttpMethod,
    url: &str,
    payload: Payload<'_, B>,
) -> Result<HttpRequest, ClientError>
where
    B: Serialize + ?Sized,
{
    let (content_type, body) = match payload {
        Payload::Empty => (None, None),
        Payload::Binary(bytes) => (Some(CONTENT_TYPE_OCTET_STREAM), Some(bytes)),
        Payload::Json(value) => {
            let encoded = serde_json::to_vec(value).map_err(ClientError::Encode)?;
            (Some(CONTENT_TYPE_JSON), Some(Bytes::from(encoded)))
        }
    };

    let headers = content_type
        .map(|ct| vec![("content-type".to_string(), ct.to_string())])
        .unwrap_or_default();

    Ok(HttpRequest {
        method,
        url: url.to_string(),
        headers,
        body,
    })
}

/// Join a relative `url` onto `base_url` with exactly one slash.
///
/// Absolute URLs, and any URL when no base is configured, pass through
/// unchanged.
pub fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    let is_absolute = has_prefix_ignore_case(url, "http://") || has_prefix_ignore_case(url, "https://");
    match base_url {
        Some(base) if !is_absolute => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        _ => url.to_string(),
    }
}

fn has_prefix_ignore_case(url: &str, prefix: &str) -> bool {
    url.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}
