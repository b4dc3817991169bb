#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use users_service::prelude::*;

/// Record Store double with a separate primary and replica.
///
/// Writes land on the primary and are copied to the replica immediately
/// unless replication is paused, which models replica lag.
#[derive(Default)]
pub struct InMemoryStore {
    primary: Mutex<HashMap<String, String>>,
    replica: Mutex<HashMap<String, String>>,
    replication_paused: AtomicBool,
    replica_reads: AtomicUsize,
    primary_writes: AtomicUsize,
    replica_down: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_users(users: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        for (id, name) in users {
            store
                .primary
                .lock()
                .unwrap()
                .insert(id.to_string(), name.to_string());
        }
        store.replicate();
        Arc::new(store)
    }

    pub fn replica_reads(&self) -> usize {
        self.replica_reads.load(Ordering::SeqCst)
    }

    pub fn primary_writes(&self) -> usize {
        self.primary_writes.load(Ordering::SeqCst)
    }

    pub fn pause_replication(&self) {
        self.replication_paused.store(true, Ordering::SeqCst);
    }

    /// Resumes replication and catches the replica up.
    pub fn resume_replication(&self) {
        self.replication_paused.store(false, Ordering::SeqCst);
        self.replicate();
    }

    pub fn set_replica_down(&self, down: bool) {
        self.replica_down.store(down, Ordering::SeqCst);
    }

    /// Makes every replica query sleep first, so concurrent misses overlap.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    fn replicate(&self) {
        let primary = self.primary.lock().unwrap().clone();
        *self.replica.lock().unwrap() = primary;
    }

    fn after_write(&self) {
        self.primary_writes.fetch_add(1, Ordering::SeqCst);
        if !self.replication_paused.load(Ordering::SeqCst) {
            self.replicate();
        }
    }
}

#[async_trait]
impl UserReader for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.replica_reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.replica_down.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("replica down", json!({})));
        }
        let replica = self.replica.lock().unwrap();
        Ok(replica.get(id).map(|name| User::new(id, name.clone())))
    }

    async fn ping_replica(&self) -> Result<(), AppError> {
        if self.replica_down.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("replica down", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl UserWriter for InMemoryStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        {
            let mut primary = self.primary.lock().unwrap();
            if primary.contains_key(&new_user.id) {
                return Err(AppError::conflict("User already exists", json!({})));
            }
            primary.insert(new_user.id.clone(), new_user.name.clone());
        }
        self.after_write();
        Ok(User::new(new_user.id, new_user.name))
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<User, AppError> {
        {
            let mut primary = self.primary.lock().unwrap();
            let Some(name) = primary.get_mut(id) else {
                return Err(AppError::not_found("User not found", json!({ "id": id })));
            };
            *name = patch.name.clone();
        }
        self.after_write();
        Ok(User::new(id, patch.name))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        if self.primary.lock().unwrap().remove(id).is_none() {
            return Err(AppError::not_found("User not found", json!({ "id": id })));
        }
        self.after_write();
        Ok(())
    }

    async fn ping_primary(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// TTL-honouring cache double driven by the tokio clock, so tests can
/// `tokio::time::advance` past expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    sets: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raw bytes stored under `key`, ignoring expiry.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| bytes.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn put_raw(&self, key: &str, bytes: &[u8], ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes.to_vec(), Instant::now() + ttl));
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((bytes, deadline)) if Instant::now() < *deadline => Ok(Some(bytes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.put_raw(key, value, ttl);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// A cache whose every operation fails, as if Redis were unreachable.
pub struct UnreachableCache;

#[async_trait]
impl CacheService for UnreachableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn invalidate(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::ConnectionError("connection refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

pub fn create_accessor(
    store: Arc<InMemoryStore>,
    cache: Arc<dyn CacheService>,
    config: AccessorConfig,
) -> UserAccessor {
    UserAccessor::new(store.clone(), store, cache, config)
}

pub fn create_test_state(store: Arc<InMemoryStore>, cache: Arc<dyn CacheService>) -> AppState {
    AppState::new(Arc::new(create_accessor(
        store,
        cache,
        AccessorConfig::default(),
    )))
}
