//! Data model for the authorization handshake
//!
//! These types cross the public boundary of the crate: the caller builds a
//! `HandshakeRequest`, receives a `HandshakeOutcome`, and feeds the identity
//! fields of a successful authorization back through the cache as an
//! `AuthResult`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel reported by fire-and-forget handshakes
pub const ACCEPTED_SENTINEL: &str = "ok";

/// Kind of authorization requested from the remote surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
    Account,
    CreateContract,
    CallContract,
    CreateTransaction,
}

impl AuthType {
    /// Wire name used in the surface URL query string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthType::Account => "account",
            AuthType::CreateContract => "createContract",
            AuthType::CallContract => "callContract",
            AuthType::CreateTransaction => "createTransaction",
        }
    }
}

impl Default for AuthType {
    fn default() -> Self {
        Self::Account
    }
}

/// Parameters for a single handshake attempt
///
/// Immutable once constructed; owned by the caller for its lifetime. `params`
/// is an opaque, caller-defined serialized payload passed through to the
/// authorization surface unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    pub app_id: String,
    pub params: String,
    pub chain_id: String,
    #[serde(default = "default_scope")]
    pub scope: Vec<i64>,
    #[serde(default)]
    pub auth_type: AuthType,
    /// When false the handshake resolves immediately after the serial
    /// exchange, without an overlay or any polling
    #[serde(default = "default_wait")]
    pub wait_for_result: bool,
}

fn default_scope() -> Vec<i64> {
    vec![2]
}

fn default_wait() -> bool {
    true
}

impl HandshakeRequest {
    /// Create a request with the default scope, auth type and wait behavior
    #[must_use]
    pub fn new(
        app_id: impl Into<String>,
        params: impl Into<String>,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            params: params.into(),
            chain_id: chain_id.into(),
            scope: default_scope(),
            auth_type: AuthType::default(),
            wait_for_result: true,
        }
    }
}

/// Identity fields delivered by a successful authorization
///
/// Unset fields mean "keep the current value" when applied to a provider;
/// `url` is always applied, including when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Resolution of a handshake
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// Decoded payload delivered by the authorization backend
    Completed(serde_json::Value),
    /// Fire-and-forget acceptance; no backend confirmation was awaited
    Accepted,
}

impl HandshakeOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, HandshakeOutcome::Accepted)
    }

    /// Decoded payload, if the handshake waited for one
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            HandshakeOutcome::Completed(payload) => Some(payload),
            HandshakeOutcome::Accepted => None,
        }
    }
}

impl fmt::Display for HandshakeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeOutcome::Completed(payload) => write!(f, "{payload}"),
            HandshakeOutcome::Accepted => write!(f, "{ACCEPTED_SENTINEL}"),
        }
    }
}
