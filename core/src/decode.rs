//! Response body decoding.

use std::borrow::Cow;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::http::HttpResponse;

/// Deserialize the response body into `T`, consuming the envelope.
///
/// An empty or whitespace-only body is [`DecodeError::EmptyBody`]. A JSON
/// `null` only succeeds when `T` itself accepts null (`Option<_>`, `()`);
/// otherwise it is rejected as malformed like any other mismatch.
///
/// A leading byte-order mark is honored: UTF-8 BOMs are stripped and UTF-16
/// bodies are transcoded to UTF-8 first.
pub fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, DecodeError> {
    let body = strip_bom(&response.body);
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DecodeError::EmptyBody);
    }
    serde_json::from_slice(&body).map_err(DecodeError::Malformed)
}

fn strip_bom(body: &[u8]) -> Cow<'_, [u8]> {
    match body {
        [0xEF, 0xBB, 0xBF, rest @ ..] => Cow::Borrowed(rest),
        [0xFF, 0xFE, rest @ ..] => Cow::Owned(utf16_to_utf8(rest, u16::from_le_bytes)),
        [0xFE, 0xFF, rest @ ..] => Cow::Owned(utf16_to_utf8(rest, u16::from_be_bytes)),
        _ => Cow::Borrowed(body),
    }
}

fn utf16_to_utf8(body: &[u8], unit: fn([u8; 2]) -> u16) -> Vec<u8> {
    let units = body.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .into_bytes()
}
