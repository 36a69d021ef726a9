//! Cached identity with a time-to-live
//!
//! A successful handshake leaves behind one identity record so the next
//! session can skip the whole exchange while the record is still fresh. The
//! backing store is a best-effort capability: it may be absent entirely, and
//! a corrupt record is treated as no record at all.

use crate::models::AuthResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default record lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(60_000);

/// Default store key holding the single identity record
pub const DEFAULT_STORE_KEY: &str = "authgate_identity";

/// Host-scoped string key-value capability
///
/// Both operations are best-effort: `get` answers `None` for anything it
/// cannot produce and `set` failures are silent. Hosts without any durable
/// storage simply do not provide an implementation.
pub trait IdentityStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Session-wide identity state, owned by the caller
///
/// The cache layer mutates this directly on read and write; everything else
/// treats it as read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provider {
    pub address: Option<String>,
    pub network_id: Option<String>,
    pub chain_id: Option<String>,
    pub url: String,
}

/// Persisted wire form of the identity record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    /// Absolute expiry, epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<i64>,
}

impl CachedRecord {
    /// A record counts only if every identity field is present and the
    /// expiry is strictly in the future
    fn is_valid(&self, now_ms: i64) -> bool {
        self.address.is_some()
            && self.network_id.is_some()
            && self.chain_id.is_some()
            && self.url.is_some()
            && self.expires.is_some_and(|expires| expires > now_ms)
    }
}

/// Read-through/write-through store for the last successful identity
pub struct CacheLayer {
    store: Option<Arc<dyn IdentityStore>>,
    key: String,
    ttl: Duration,
}

impl CacheLayer {
    #[must_use]
    pub fn new(store: Option<Arc<dyn IdentityStore>>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
        }
    }

    /// Copy a still-valid cached identity onto the provider
    ///
    /// An absent store, a missing key, a corrupt record (logged, never
    /// surfaced) or an expired record all leave the provider untouched.
    pub fn read(&self, provider: &mut Provider) {
        let Some(store) = &self.store else { return };
        let Some(raw) = store.get(&self.key) else {
            return;
        };

        match serde_json::from_str::<CachedRecord>(&raw) {
            Ok(record) if record.is_valid(Utc::now().timestamp_millis()) => {
                log::debug!("restoring identity from cache");
                provider.address = record.address;
                provider.network_id = record.network_id;
                provider.chain_id = record.chain_id;
                provider.url = record.url.unwrap_or_default();
            }
            Ok(_) => log::debug!("cached identity absent, incomplete or expired"),
            Err(e) => log::error!("discarding unreadable identity cache: {e}"),
        }
    }

    /// Persist `data` with a fresh expiry and apply it onto the provider
    ///
    /// The stored record carries exactly the supplied fields plus
    /// `expires = now + ttl`. On the provider, unsupplied identity fields
    /// keep their current value; `url` is always overwritten, including with
    /// an empty value. Returns the input unchanged for chaining.
    pub fn write(&self, data: AuthResult, provider: &mut Provider) -> AuthResult {
        if let Some(store) = &self.store {
            let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
            let record = CachedRecord {
                address: data.address.clone(),
                network_id: data.network_id.clone(),
                chain_id: data.chain_id.clone(),
                url: Some(data.url.clone()),
                expires: Some(Utc::now().timestamp_millis() + ttl_ms),
            };
            if let Ok(raw) = serde_json::to_string(&record) {
                store.set(&self.key, &raw);
            }
        }

        provider.address = data.address.clone().or_else(|| provider.address.take());
        provider.network_id = data.network_id.clone().or_else(|| provider.network_id.take());
        provider.chain_id = data.chain_id.clone().or_else(|| provider.chain_id.take());
        provider.url = data.url.clone();
        data
    }
}

/// File-backed store for native hosts
///
/// Keeps a single JSON object of key-value pairs. Read and write failures
/// degrade to "no record" and "no write" respectively.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentityStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw).ok()?;
        map.get(key)?.as_str().map(ToString::to_string)
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw).ok())
            .unwrap_or_default();
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));

        match serde_json::to_string(&map) {
            Ok(raw) => {
                if let Err(e) = fs::write(&self.path, raw) {
                    log::warn!("identity store write failed: {e}");
                }
            }
            Err(e) => log::warn!("identity store serialization failed: {e}"),
        }
    }
}
