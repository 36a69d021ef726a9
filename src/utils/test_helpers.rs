// Test utilities shared across modules
use crate::cache::IdentityStore;
use crate::overlay::{DismissCallback, OverlayChrome, SurfaceSpec};
use crate::settings::AuthgateSettings;
use crate::transport::ApiClient;
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Settings pointed at non-routable hosts, with a short poll budget
#[must_use]
pub fn create_test_settings() -> AuthgateSettings {
    let mut settings = AuthgateSettings::default();
    settings.api.base_url = "https://api.test.invalid".to_string();
    settings.ui.base_url = "https://ui.test.invalid".to_string();
    settings.poll.interval_ms = 5;
    settings.poll.max_wait_ms = 100;
    settings
}

/// Scripted [`ApiClient`]: replies are served in push order, then the
/// default reply (when set) forever, then an error
pub struct MockApiClient {
    replies: Mutex<VecDeque<Result<Value, String>>>,
    default_reply: Mutex<Option<Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Value) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Reply served whenever the scripted queue is exhausted
    pub fn set_default_reply(&self, reply: Value) {
        *self.default_reply.lock().unwrap() = Some(reply);
    }

    /// Every `(url, body)` pair seen so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose URL ends with `suffix`
    #[must_use]
    pub fn calls_to(&self, suffix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.ends_with(suffix))
            .count()
    }
}

impl Default for MockApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn post_json(&self, url: &str, body: &Value) -> anyhow::Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));

        if let Some(scripted) = self.replies.lock().unwrap().pop_front() {
            return scripted.map_err(|message| anyhow!(message));
        }
        if let Some(default) = self.default_reply.lock().unwrap().clone() {
            return Ok(default);
        }
        Err(anyhow!("no scripted reply for {url}"))
    }
}

/// Chrome without a display: records mounts, unmounts and scroll-lock
/// transitions, and lets tests trigger the user-dismiss path
pub struct HeadlessChrome {
    viewport_width: u32,
    mounted: AtomicBool,
    scroll_locked: AtomicBool,
    unmounts: AtomicUsize,
    mounts: Mutex<Vec<SurfaceSpec>>,
    on_dismiss: Mutex<Option<DismissCallback>>,
}

impl HeadlessChrome {
    #[must_use]
    pub fn new(viewport_width: u32) -> Self {
        Self {
            viewport_width,
            mounted: AtomicBool::new(false),
            scroll_locked: AtomicBool::new(false),
            unmounts: AtomicUsize::new(0),
            mounts: Mutex::new(Vec::new()),
            on_dismiss: Mutex::new(None),
        }
    }

    /// Simulate the user closing the surface: the chrome removes it first,
    /// then fires the dismiss callback, like a real implementation
    pub fn dismiss(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        let callback = self.on_dismiss.lock().unwrap().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unmount_count(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    /// Specs of every surface mounted so far
    #[must_use]
    pub fn mounted_specs(&self) -> Vec<SurfaceSpec> {
        self.mounts.lock().unwrap().clone()
    }
}

impl OverlayChrome for HeadlessChrome {
    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    fn mount(&self, spec: &SurfaceSpec, on_dismiss: DismissCallback) {
        self.mounts.lock().unwrap().push(spec.clone());
        self.mounted.store(true, Ordering::SeqCst);
        *self.on_dismiss.lock().unwrap() = Some(on_dismiss);
    }

    fn unmount(&self) {
        if self.mounted.swap(false, Ordering::SeqCst) {
            self.unmounts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn set_scroll_locked(&self, locked: bool) {
        self.scroll_locked.store(locked, Ordering::SeqCst);
    }
}

/// In-memory [`IdentityStore`]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}
