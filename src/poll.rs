//! Result polling state machine
//!
//! The hardest part of the handshake: a timer-driven loop that races two
//! cancellation sources (the overall timeout and the user's dismissal of the
//! overlay) and must settle exactly once. The loop is explicit rather than a
//! self-rescheduling callback chain: a single function with one return path
//! per terminal state, where dropping the interval sleep is the synchronous
//! timer disarm.

use crate::handshake::HandshakeError;
use crate::overlay::OverlayHandle;
use crate::transport::ApiClient;
use anyhow::Context;
use serde_json::{json, Value};
use std::time::Duration;

/// Endpoint path for result queries
pub const SERIAL_READ_PATH: &str = "/open/serial/read";

/// Tick interval between result queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Overall wait budget for one handshake (10 minutes)
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(600_000);

/// Timing knobs for the poll loop
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Strict two-case normalization of the result field
#[derive(Debug, Clone, PartialEq)]
enum PollReply {
    NotReady,
    Ready(Value),
}

/// Normalize the loosely-typed `data` field of a read response
///
/// The backend reports "no result yet" as an absent field, `null`, boolean
/// `false` or the string `"false"`. Anything else is a result; string
/// results carry a JSON-encoded payload that is decoded here, at the
/// boundary, so the ambiguity never reaches the state machine.
fn classify_reply(data: Option<&Value>) -> anyhow::Result<PollReply> {
    match data {
        None | Some(Value::Null | Value::Bool(false)) => Ok(PollReply::NotReady),
        Some(Value::String(text)) if text == "false" => Ok(PollReply::NotReady),
        Some(Value::String(text)) => {
            let payload = serde_json::from_str(text).context("result payload is not valid JSON")?;
            Ok(PollReply::Ready(payload))
        }
        Some(other) => Ok(PollReply::Ready(other.clone())),
    }
}

async fn query_once(
    client: &dyn ApiClient,
    url: &str,
    body: &Value,
) -> anyhow::Result<PollReply> {
    let response = client.post_json(url, body).await?;
    classify_reply(response.get("data"))
}

/// Poll the read endpoint until a result arrives, the budget runs out, or
/// the user dismisses the overlay
///
/// Tick 0 fires immediately; every further tick is scheduled only after the
/// previous reply was classified, so ticks never overlap. The deadline is
/// measured in scheduled time (`tick * interval`), not wall clock. Transient
/// query failures are logged and swallowed; the loop keeps going, bounded
/// only by the overall budget.
///
/// Settles exactly once. The winning terminal path tears the overlay down,
/// except for user dismissal, where the dismiss path has already removed the
/// surface itself.
///
/// # Errors
///
/// Returns [`HandshakeError::Timeout`] when the budget elapses without a
/// result and [`HandshakeError::UserCancelled`] when the user dismisses the
/// overlay first.
pub async fn poll_for_result(
    client: &dyn ApiClient,
    api_base_url: &str,
    serial: &str,
    fingerprint: &str,
    overlay: &OverlayHandle,
    config: PollConfig,
) -> Result<Value, HandshakeError> {
    let url = format!("{api_base_url}{SERIAL_READ_PATH}");
    let body = json!({ "serialNumber": serial, "hash": fingerprint });

    let mut tick: u32 = 0;
    loop {
        match query_once(client, &url, &body).await {
            Ok(PollReply::Ready(payload)) => {
                log::debug!("result ready after {tick} ticks");
                overlay.close();
                return Ok(payload);
            }
            Ok(PollReply::NotReady) => {}
            Err(e) => log::warn!("poll tick {tick} failed, will retry: {e}"),
        }

        if config.interval * tick >= config.max_wait {
            log::warn!("no result within {:?}", config.max_wait);
            overlay.close();
            return Err(HandshakeError::Timeout);
        }
        tick += 1;

        tokio::select! {
            () = overlay.dismissed() => {
                // the dismiss path already removed the surface and released
                // the scroll lock; dropping the sleep disarms the timer
                return Err(HandshakeError::UserCancelled);
            }
            () = tokio::time::sleep(config.interval) => {}
        }
    }
}
