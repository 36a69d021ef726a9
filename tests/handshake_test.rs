// End-to-end handshake flows against scripted collaborators
use authgate::utils::test_helpers::{create_test_settings, HeadlessChrome, MockApiClient};
use authgate::{
    ApiClient, AuthgateClient, HandshakeError, HandshakeOutcome, HandshakeRequest, OverlayChrome,
};
use serde_json::json;
use std::sync::Arc;

const SERIAL_REPLY: &str = "serial-xyz";

fn build_client(api: &Arc<MockApiClient>, chrome: &Arc<HeadlessChrome>) -> AuthgateClient {
    AuthgateClient::new(
        create_test_settings(),
        Arc::clone(api) as Arc<dyn ApiClient>,
        Arc::clone(chrome) as Arc<dyn OverlayChrome>,
        None,
    )
}

fn push_serial_reply(api: &MockApiClient) {
    api.push_reply(json!({ "data": { "serialNumber": SERIAL_REPLY } }));
}

#[tokio::test(start_paused = true)]
async fn successful_handshake_resolves_with_decoded_payload() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    push_serial_reply(&api);
    api.push_reply(json!({ "data": false }));
    api.push_reply(json!({ "data": "false" }));
    api.push_reply(json!({ "data": "{\"address\":\"0x1\",\"networkId\":\"1\"}" }));

    let client = build_client(&api, &chrome);
    let request = HandshakeRequest::new("app-1", "{}", "1029");

    let outcome = client.authorize("/auth", &request).await.unwrap();
    assert_eq!(
        outcome,
        HandshakeOutcome::Completed(json!({ "address": "0x1", "networkId": "1" }))
    );

    // overlay torn down and scroll restored on the success path
    assert!(!chrome.is_mounted());
    assert!(!chrome.is_scroll_locked());
    assert_eq!(chrome.unmount_count(), 1);

    // the surface URL carried the serial and the fingerprint
    let specs = chrome.mounted_specs();
    assert_eq!(specs.len(), 1);
    assert!(specs[0].url.contains(SERIAL_REPLY));
    assert!(specs[0].url.contains("hash="));

    assert_eq!(api.calls_to("/open/serial/create"), 1);
    assert_eq!(api.calls_to("/open/serial/read"), 3);
}

#[tokio::test]
async fn fire_and_forget_never_polls() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    push_serial_reply(&api);

    let client = build_client(&api, &chrome);
    let mut request = HandshakeRequest::new("app-1", "{}", "1029");
    request.wait_for_result = false;

    let outcome = client.authorize("/auth", &request).await.unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(outcome.to_string(), "ok");

    assert_eq!(api.calls_to("/open/serial/read"), 0);
    assert!(chrome.mounted_specs().is_empty());
    assert!(!chrome.is_scroll_locked());
}

#[tokio::test]
async fn failed_serial_exchange_aborts_before_any_overlay() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    api.push_error("backend down");

    let client = build_client(&api, &chrome);
    let request = HandshakeRequest::new("app-1", "{}", "1029");

    let err = client.authorize("/auth", &request).await.unwrap_err();
    assert!(matches!(err, HandshakeError::SerialAcquisition(_)));
    assert!(chrome.mounted_specs().is_empty());
    assert!(!chrome.is_scroll_locked());
}

#[tokio::test(start_paused = true)]
async fn timeout_fires_at_iteration_750_with_default_budget() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    push_serial_reply(&api);
    api.set_default_reply(json!({ "data": false }));

    let mut settings = create_test_settings();
    settings.poll.interval_ms = 800;
    settings.poll.max_wait_ms = 600_000;
    let client = AuthgateClient::new(
        settings,
        Arc::clone(&api) as Arc<dyn ApiClient>,
        Arc::clone(&chrome) as Arc<dyn OverlayChrome>,
        None,
    );
    let request = HandshakeRequest::new("app-1", "{}", "1029");

    let err = client.authorize("/auth", &request).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Timeout));

    // ticks 0..=749 pass the deadline check, tick 750 trips it:
    // 751 queries in total, never fewer
    assert_eq!(api.calls_to("/open/serial/read"), 751);
    assert!(!chrome.is_mounted());
    assert!(!chrome.is_scroll_locked());
}

#[tokio::test(start_paused = true)]
async fn user_dismissal_cancels_the_handshake() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    push_serial_reply(&api);
    api.set_default_reply(json!({ "data": false }));

    let mut settings = create_test_settings();
    // generous budget so the loop cannot time out under auto-advanced time
    settings.poll.max_wait_ms = 600_000;
    let client = AuthgateClient::new(
        settings,
        Arc::clone(&api) as Arc<dyn ApiClient>,
        Arc::clone(&chrome) as Arc<dyn OverlayChrome>,
        None,
    );

    let handshake = tokio::spawn(async move {
        let request = HandshakeRequest::new("app-1", "{}", "1029");
        client.authorize("/auth", &request).await
    });

    // let the handshake reach the poll loop, then close the surface
    while chrome.mounted_specs().is_empty() {
        tokio::task::yield_now().await;
    }
    chrome.dismiss();

    let err = handshake.await.unwrap().unwrap_err();
    assert!(matches!(err, HandshakeError::UserCancelled));
    assert!(!chrome.is_mounted());
    assert!(!chrome.is_scroll_locked());
    // the dismiss path removed the surface itself; the loop must not unmount
    assert_eq!(chrome.unmount_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_are_swallowed() {
    let api = Arc::new(MockApiClient::new());
    let chrome = Arc::new(HeadlessChrome::new(1280));
    push_serial_reply(&api);
    api.push_error("connection reset");
    api.push_reply(json!({ "data": "not valid json{" }));
    api.push_reply(json!({ "data": "\"done\"" }));

    let client = build_client(&api, &chrome);
    let request = HandshakeRequest::new("app-1", "{}", "1029");

    let outcome = client.authorize("/auth", &request).await.unwrap();
    assert_eq!(outcome, HandshakeOutcome::Completed(json!("done")));
    assert_eq!(api.calls_to("/open/serial/read"), 3);
}

mod poll_races {
    //! The exactly-once guarantee under racing terminal transitions
    use super::*;
    use authgate::poll::{poll_for_result, PollConfig};
    use authgate::OverlayHandle;
    use std::time::Duration;

    const POLL_CONFIG: PollConfig = PollConfig {
        interval: Duration::from_millis(800),
        max_wait: Duration::from_millis(600_000),
    };

    #[tokio::test(start_paused = true)]
    async fn ready_result_wins_when_dismissal_raced_it() {
        let api = MockApiClient::new();
        api.push_reply(json!({ "data": "{\"address\":\"0x1\"}" }));
        let chrome = Arc::new(HeadlessChrome::new(1280));
        let overlay = OverlayHandle::open(Arc::clone(&chrome) as Arc<dyn OverlayChrome>, "u");

        // dismissal lands before the loop runs its first tick
        chrome.dismiss();

        let outcome =
            poll_for_result(&api, "https://api.test.invalid", "s", "h", &overlay, POLL_CONFIG)
                .await;

        // exactly one terminal outcome, and the first one is the resolution
        assert_eq!(outcome.unwrap(), json!({ "address": "0x1" }));
        // the dismiss path tore the surface down already; no second unmount
        assert_eq!(chrome.unmount_count(), 0);
        assert!(!chrome.is_scroll_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn dismissal_wins_when_no_result_is_ready() {
        let api = MockApiClient::new();
        api.set_default_reply(json!({ "data": false }));
        let chrome = Arc::new(HeadlessChrome::new(1280));
        let overlay = OverlayHandle::open(Arc::clone(&chrome) as Arc<dyn OverlayChrome>, "u");

        chrome.dismiss();

        let err =
            poll_for_result(&api, "https://api.test.invalid", "s", "h", &overlay, POLL_CONFIG)
                .await
                .unwrap_err();
        assert!(matches!(err, HandshakeError::UserCancelled));
        // no tick beyond the first was issued
        assert_eq!(api.calls_to("/open/serial/read"), 1);
    }
}
