pub mod auth;
pub mod health;
pub mod item;

use crate::error::ApiError;
use axum::{body::Bytes, http::HeaderMap};
use serde::de::DeserializeOwned;

/// The `x-request-id` stamped on by `SetRequestIdLayer`, or "-" when there isn't one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Decodes a JSON body, keeping "nothing was sent" apart from "what was sent is junk".
///
/// The caller logs; this just classifies.
pub fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, (ApiError, Option<serde_json::Error>)> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err((ApiError::EmptyRequest, None));
    }

    serde_json::from_slice(body).map_err(|e| (ApiError::DecodeError, Some(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[allow(dead_code)]
        name: String,
    }

    #[test]
    fn empty_and_blank_bodies_are_empty_requests() {
        for raw in ["", "   ", "\n"] {
            let err = decode_json::<Probe>(&Bytes::from(raw)).unwrap_err();
            assert_eq!(err.0, ApiError::EmptyRequest);
        }
    }

    #[test]
    fn junk_is_a_decode_error() {
        let err = decode_json::<Probe>(&Bytes::from("{not json")).unwrap_err();
        assert_eq!(err.0, ApiError::DecodeError);
        assert!(err.1.is_some());
    }

    #[test]
    fn valid_json_decodes() {
        assert!(decode_json::<Probe>(&Bytes::from(r#"{"name":"x"}"#)).is_ok());
    }

    #[test]
    fn missing_request_id_is_a_dash() {
        assert_eq!(request_id(&HeaderMap::new()), "-");
    }
}
