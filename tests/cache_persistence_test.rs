// Identity cache round-trips through the file-backed store
use authgate::cache::DEFAULT_STORE_KEY;
use authgate::{AuthResult, CacheLayer, FileStore, IdentityStore, Provider};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_millis(60_000);

fn file_cache(path: &std::path::Path) -> CacheLayer {
    let store = Arc::new(FileStore::new(path)) as Arc<dyn IdentityStore>;
    CacheLayer::new(Some(store), DEFAULT_STORE_KEY, TTL)
}

fn full_result() -> AuthResult {
    AuthResult {
        address: Some("0xabc".to_string()),
        network_id: Some("1".to_string()),
        chain_id: Some("1029".to_string()),
        url: "https://rpc.example".to_string(),
    }
}

#[test]
fn identity_survives_a_new_cache_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut provider = Provider::default();
    file_cache(&path).write(full_result(), &mut provider);

    // a fresh layer over the same file restores the identity
    let mut restored = Provider::default();
    file_cache(&path).read(&mut restored);
    assert_eq!(restored.address.as_deref(), Some("0xabc"));
    assert_eq!(restored.network_id.as_deref(), Some("1"));
    assert_eq!(restored.chain_id.as_deref(), Some("1029"));
    assert_eq!(restored.url, "https://rpc.example");
}

#[test]
fn missing_store_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-written.json");

    let mut provider = Provider::default();
    file_cache(&path).read(&mut provider);
    assert_eq!(provider, Provider::default());
}

#[test]
fn corrupt_store_file_reads_as_empty_and_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "definitely not json").unwrap();

    let mut provider = Provider::default();
    let cache = file_cache(&path);
    cache.read(&mut provider);
    assert_eq!(provider, Provider::default());

    // a write replaces the corrupt file and the record becomes readable
    cache.write(full_result(), &mut provider);
    let mut restored = Provider::default();
    file_cache(&path).read(&mut restored);
    assert_eq!(restored.address.as_deref(), Some("0xabc"));
}

#[test]
fn store_file_keeps_unrelated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = FileStore::new(&path);
    store.set("other_key", "other_value");

    let mut provider = Provider::default();
    file_cache(&path).write(full_result(), &mut provider);

    assert_eq!(store.get("other_key").as_deref(), Some("other_value"));
    assert!(store.get(DEFAULT_STORE_KEY).is_some());
}
