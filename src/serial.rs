//! Serial token acquisition
//!
//! One handshake attempt is tracked by one short-lived serial token issued by
//! the backend in exchange for the request fingerprint. There is no retry at
//! this layer: a failed exchange aborts the handshake before any overlay is
//! shown.

use crate::handshake::HandshakeError;
use crate::transport::ApiClient;
use serde_json::{json, Value};

/// Endpoint path for the serial exchange
pub const SERIAL_CREATE_PATH: &str = "/open/serial/create";

/// Opaque backend identifier for one pending authorization
pub type SerialToken = String;

/// Exchange a request fingerprint for a serial token
///
/// POSTs `{hash}` to `{api_base_url}/open/serial/create` and extracts
/// `data.serialNumber` from the response.
///
/// # Errors
///
/// Returns [`HandshakeError::SerialAcquisition`] if the call fails or the
/// response does not carry a serial number.
pub async fn request_serial(
    client: &dyn ApiClient,
    api_base_url: &str,
    fingerprint: &str,
) -> Result<SerialToken, HandshakeError> {
    let url = format!("{api_base_url}{SERIAL_CREATE_PATH}");
    let body = json!({ "hash": fingerprint });

    let response = client.post_json(&url, &body).await.map_err(|e| {
        log::error!("serial exchange failed: {e}");
        HandshakeError::SerialAcquisition(e.to_string())
    })?;

    response
        .pointer("/data/serialNumber")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            log::error!("serial exchange returned an unexpected shape: {response}");
            HandshakeError::SerialAcquisition("missing data.serialNumber in response".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::MockApiClient;
    use serde_json::json;

    #[tokio::test]
    async fn extracts_serial_from_response() {
        let client = MockApiClient::new();
        client.push_reply(json!({ "data": { "serialNumber": "serial-123" } }));

        let serial = request_serial(&client, "https://api.example", "abc")
            .await
            .unwrap();
        assert_eq!(serial, "serial-123");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://api.example/open/serial/create");
        assert_eq!(calls[0].1, json!({ "hash": "abc" }));
    }

    #[tokio::test]
    async fn malformed_shape_is_a_serial_acquisition_error() {
        let client = MockApiClient::new();
        client.push_reply(json!({ "data": {} }));

        let err = request_serial(&client, "https://api.example", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::SerialAcquisition(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_a_serial_acquisition_error() {
        let client = MockApiClient::new();
        client.push_error("connection refused");

        let err = request_serial(&client, "https://api.example", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::SerialAcquisition(_)));
    }
}
