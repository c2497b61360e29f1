use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ApiError, Error, RequestError, Result};

/// Decode a `{ ...payload, error? }` response envelope.
///
/// - A non-null `error` field always yields [`Error::Api`], even next to payload data.
/// - A body that is not JSON yields [`RequestError::Server`] for non-2xx statuses and
///   [`RequestError::DecodeJson`] otherwise.
/// - A JSON body without `error` on a non-2xx status yields [`RequestError::Server`].
pub(crate) async fn decode_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    decode_envelope_bytes(status, &bytes)
}

pub(crate) fn decode_envelope_bytes<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T> {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) if !status.is_success() => return Err(server_error(status, bytes)),
        Err(e) => {
            return Err(RequestError::DecodeJson {
                message: e.to_string(),
            }
            .into());
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let api = serde_json::from_value::<ApiError>(error.clone()).unwrap_or_else(|_| ApiError {
            status: status.as_u16(),
            message: match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        });
        return Err(Error::Api(api));
    }

    if !status.is_success() {
        return Err(server_error(status, bytes));
    }

    serde_json::from_value(value).map_err(|e| {
        RequestError::DecodeJson {
            message: e.to_string(),
        }
        .into()
    })
}

fn server_error(status: StatusCode, bytes: &[u8]) -> Error {
    let body = String::from_utf8_lossy(bytes);
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string()
    } else {
        body.into_owned()
    };
    Error::from(RequestError::Server { status, message })
}
