//! Handshake orchestration
//!
//! Ties the pieces together: fingerprint the request, exchange it for a
//! serial token, open the overlay on the constructed surface URL and poll
//! until a terminal outcome. Only the three terminal errors defined here
//! ever cross the public boundary; everything else is absorbed with a log
//! line further down the stack.

use crate::cache::{CacheLayer, IdentityStore};
use crate::fingerprint::request_fingerprint;
use crate::models::{HandshakeOutcome, HandshakeRequest};
use crate::overlay::{OverlayChrome, OverlayHandle};
use crate::poll::{poll_for_result, PollConfig};
use crate::serial::request_serial;
use crate::settings::AuthgateSettings;
use crate::transport::ApiClient;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Terminal handshake failures
#[derive(Debug)]
pub enum HandshakeError {
    /// The serial exchange failed or returned an unexpected shape;
    /// the handshake aborted before any overlay was shown
    SerialAcquisition(String),
    /// The user dismissed the overlay before a result arrived
    UserCancelled,
    /// No result within the poll budget
    Timeout,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::SerialAcquisition(msg) => {
                write!(f, "serial acquisition failed: {msg}")
            }
            HandshakeError::UserCancelled => write!(f, "user cancelled the authorization"),
            HandshakeError::Timeout => write!(f, "authorization timed out"),
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Client for the out-of-band authorization handshake
///
/// Owns the injected collaborators (transport, presentation chrome, identity
/// store) plus the settings, and exposes the one entry point, [`authorize`].
///
/// [`authorize`]: AuthgateClient::authorize
pub struct AuthgateClient {
    settings: AuthgateSettings,
    api: Arc<dyn ApiClient>,
    chrome: Arc<dyn OverlayChrome>,
    cache: CacheLayer,
}

impl AuthgateClient {
    #[must_use]
    pub fn new(
        settings: AuthgateSettings,
        api: Arc<dyn ApiClient>,
        chrome: Arc<dyn OverlayChrome>,
        store: Option<Arc<dyn IdentityStore>>,
    ) -> Self {
        let cache = CacheLayer::new(
            store,
            settings.cache.store_key.clone(),
            Duration::from_millis(settings.cache.ttl_ms),
        );
        Self {
            settings,
            api,
            chrome,
            cache,
        }
    }

    /// Identity cache for this client
    ///
    /// Read it at session start to skip a fresh handshake while the last
    /// record is still valid; write it after a successful authorization.
    #[must_use]
    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Run one authorization handshake against the surface at `path`
    ///
    /// Precondition: at most one handshake may be in flight at a time; the
    /// overlay and the scroll lock are exclusively owned by the active
    /// handshake. This is not enforced internally.
    ///
    /// # Errors
    ///
    /// - [`HandshakeError::SerialAcquisition`] if the token exchange fails;
    ///   no overlay is shown on this path.
    /// - [`HandshakeError::UserCancelled`] if the user dismisses the overlay.
    /// - [`HandshakeError::Timeout`] if no result arrives within the budget.
    pub async fn authorize(
        &self,
        path: &str,
        request: &HandshakeRequest,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        let fingerprint = request_fingerprint(&request.app_id, &request.params);
        let serial =
            request_serial(self.api.as_ref(), &self.settings.api.base_url, &fingerprint).await?;
        log::debug!("serial acquired for app {}", request.app_id);

        if !request.wait_for_result {
            log::debug!("fire-and-forget handshake, skipping overlay and poll");
            return Ok(HandshakeOutcome::Accepted);
        }

        let url = self.surface_url(path, request, &serial, &fingerprint);
        let overlay = OverlayHandle::open(Arc::clone(&self.chrome), &url);

        let payload = poll_for_result(
            self.api.as_ref(),
            &self.settings.api.base_url,
            &serial,
            &fingerprint,
            &overlay,
            self.poll_config(),
        )
        .await?;

        Ok(HandshakeOutcome::Completed(payload))
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.settings.poll.interval_ms),
            max_wait: Duration::from_millis(self.settings.poll.max_wait_ms),
        }
    }

    /// Build the URL the embedded surface is pointed at
    ///
    /// `random` defeats caching of the embedded page and has no protocol
    /// meaning; `scope` travels JSON-encoded.
    fn surface_url(
        &self,
        path: &str,
        request: &HandshakeRequest,
        serial: &str,
        fingerprint: &str,
    ) -> String {
        let scope = serde_json::to_string(&request.scope).unwrap_or_else(|_| "[2]".to_string());
        let random: u16 = rand::rng().random_range(0..1000);

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("appId", &request.app_id)
            .append_pair("authType", request.auth_type.as_str())
            .append_pair("serialNumber", serial)
            .append_pair("hash", fingerprint)
            .append_pair("random", &random.to_string())
            .append_pair("chainId", &request.chain_id)
            .append_pair("params", &request.params)
            .append_pair("scope", &scope)
            .finish();

        format!("{}{}?{}", self.settings.ui.base_url, path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{create_test_settings, HeadlessChrome, MockApiClient};

    fn test_client(api: Arc<MockApiClient>, chrome: Arc<HeadlessChrome>) -> AuthgateClient {
        AuthgateClient::new(
            create_test_settings(),
            api as Arc<dyn ApiClient>,
            chrome as Arc<dyn OverlayChrome>,
            None,
        )
    }

    #[test]
    fn surface_url_carries_every_parameter() {
        let client = test_client(
            Arc::new(MockApiClient::new()),
            Arc::new(HeadlessChrome::new(1280)),
        );
        let request = HandshakeRequest::new("app-1", "{\"k\":\"v\"}", "1029");

        let url = client.surface_url("/auth", &request, "serial-1", "feedbeef");
        assert!(url.starts_with("https://ui.test.invalid/auth?"));
        assert!(url.contains("appId=app-1"));
        assert!(url.contains("authType=account"));
        assert!(url.contains("serialNumber=serial-1"));
        assert!(url.contains("hash=feedbeef"));
        assert!(url.contains("random="));
        assert!(url.contains("chainId=1029"));
        // params and scope are percent-encoded
        assert!(url.contains("params=%7B%22k%22%3A%22v%22%7D"));
        assert!(url.contains("scope=%5B2%5D"));
    }

    #[test]
    fn error_display_is_stable() {
        assert_eq!(
            HandshakeError::SerialAcquisition("boom".to_string()).to_string(),
            "serial acquisition failed: boom"
        );
        assert_eq!(
            HandshakeError::UserCancelled.to_string(),
            "user cancelled the authorization"
        );
        assert_eq!(HandshakeError::Timeout.to_string(), "authorization timed out");
    }
}
