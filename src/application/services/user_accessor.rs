//! Cache-aside access to user records.
//!
//! Reads try the cache, fall back to the replica on a miss and populate the
//! cache with what the replica returned. Writes go to the primary and then
//! invalidate the cached entry; the cache is never written from the write path,
//! so a value only enters the cache after it has been read back from the store.
//!
//! # Consistency
//!
//! Freshness is best-effort. A miss that reads a lagging replica, or that
//! populates after a concurrent write's invalidation, can cache a pre-write
//! value. Such an entry lives at most one TTL.
//!
//! # Failure policy
//!
//! Cache failures are logged and absorbed: a failed `get` is a miss, a failed
//! `set` or `invalidate` is ignored. Record Store failures always reach the
//! caller unchanged.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::json;
use tracing::{debug, warn};

use super::single_flight::SingleFlight;
use crate::domain::entities::{NewUser, User, UserPatch, validate_id};
use crate::domain::repositories::{UserReader, UserWriter};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

pub const METRIC_CACHE_HIT: &str = "user_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "user_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "user_cache_error_total";
pub const METRIC_CACHE_INVALIDATE: &str = "user_cache_invalidate_total";

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Tunables for [`UserAccessor`].
#[derive(Debug, Clone)]
pub struct AccessorConfig {
    /// Lifetime of an entry populated on a miss.
    pub ttl: Duration,
    /// Collapse concurrent misses on the same key into one replica query.
    pub single_flight: bool,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            single_flight: false,
        }
    }
}

/// A mutation applied through [`UserAccessor::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Insert(NewUser),
    Update(UserPatch),
    Delete,
}

/// Primary's success payload for a [`WriteOp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created(User),
    Updated(User),
    Deleted,
}

/// Mediates every user read and write between the caller, the cache and the
/// Record Store.
///
/// All collaborators are injected, so several accessors can coexist in one
/// process and tests can substitute any of them.
pub struct UserAccessor {
    reader: Arc<dyn UserReader>,
    writer: Arc<dyn UserWriter>,
    cache: Arc<dyn CacheService>,
    ttl: Duration,
    flights: Option<SingleFlight>,
}

impl UserAccessor {
    pub fn new(
        reader: Arc<dyn UserReader>,
        writer: Arc<dyn UserWriter>,
        cache: Arc<dyn CacheService>,
        config: AccessorConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            ttl: config.ttl,
            flights: config.single_flight.then(SingleFlight::new),
        }
    }

    pub fn reader(&self) -> &Arc<dyn UserReader> {
        &self.reader
    }

    pub fn writer(&self) -> &Arc<dyn UserWriter> {
        &self.writer
    }

    pub fn cache(&self) -> &Arc<dyn CacheService> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a user, serving from the cache when possible.
    ///
    /// A cache hit never touches the Record Store. On a miss the replica is
    /// queried and a found record is cached before being returned; absent keys
    /// are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the replica has no such user.
    /// Returns [`AppError::StoreUnavailable`] if the replica query fails.
    pub async fn read(&self, id: &str) -> Result<User, AppError> {
        if let Some(user) = self.cached(id).await {
            return Ok(user);
        }

        let Some(flights) = &self.flights else {
            return self.load(id).await;
        };

        let _flight = flights.acquire(id).await;
        // Whoever held the key before us has likely populated it.
        if let Some(user) = self.cached(id).await {
            return Ok(user);
        }
        self.load(id).await
    }

    /// Applies a mutation on the primary and invalidates the cached entry.
    ///
    /// For [`WriteOp::Insert`] the payload's id must equal `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for malformed input, before any store access.
    /// Otherwise returns whatever the primary reported: [`AppError::Conflict`],
    /// [`AppError::NotFound`] or [`AppError::StoreUnavailable`].
    pub async fn write(&self, id: &str, op: WriteOp) -> Result<WriteOutcome, AppError> {
        match op {
            WriteOp::Insert(new_user) => {
                if new_user.id != id {
                    return Err(AppError::bad_request(
                        "Key does not match the record id",
                        json!({ "key": id, "id": new_user.id }),
                    ));
                }
                self.create(new_user).await.map(WriteOutcome::Created)
            }
            WriteOp::Update(patch) => self.update(id, patch).await.map(WriteOutcome::Updated),
            WriteOp::Delete => self.delete(id).await.map(|()| WriteOutcome::Deleted),
        }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        new_user.validate()?;

        let id = new_user.id.clone();
        let user = self.writer.insert(new_user).await?;
        // A stale entry can exist if the key was deleted and re-created within a TTL.
        self.invalidate(&id).await;
        Ok(user)
    }

    pub async fn update(&self, id: &str, patch: UserPatch) -> Result<User, AppError> {
        validate_id(id)?;
        patch.validate()?;

        let user = self.writer.update(id, patch).await?;
        self.invalidate(id).await;
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        validate_id(id)?;

        self.writer.delete(id).await?;
        self.invalidate(id).await;
        Ok(())
    }

    /// Drops the cached entry for `id`, logging instead of failing.
    pub async fn invalidate(&self, id: &str) {
        match self.cache.invalidate(id).await {
            Ok(()) => {
                counter!(METRIC_CACHE_INVALIDATE).increment(1);
            }
            Err(e) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                warn!(key = id, error = %e, "Cache invalidation failed; entry may stay stale until TTL");
            }
        }
    }

    async fn cached(&self, id: &str) -> Option<User> {
        let bytes = match self.cache.get(id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                warn!(key = id, error = %e, "Cache read failed; falling back to replica");
                return None;
            }
        };

        match serde_json::from_slice::<User>(&bytes) {
            Ok(user) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(key = id, "Cache HIT");
                Some(user)
            }
            Err(e) => {
                warn!(key = id, error = %e, "Discarding undecodable cache entry");
                self.invalidate(id).await;
                None
            }
        }
    }

    async fn load(&self, id: &str) -> Result<User, AppError> {
        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(key = id, "Cache MISS");

        let user = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({ "id": id })))?;

        self.populate(id, &user).await;
        Ok(user)
    }

    async fn populate(&self, id: &str, user: &User) {
        let bytes = match serde_json::to_vec(user) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = id, error = %e, "Failed to serialize user for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set(id, &bytes, self.ttl).await {
            counter!(METRIC_CACHE_ERROR).increment(1);
            warn!(key = id, error = %e, "Cache populate failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{MockUserReader, MockUserWriter};
    use crate::infrastructure::cache::{CacheError, MockCacheService};

    fn alice() -> User {
        User::new("42", "Alice")
    }

    fn alice_bytes() -> Vec<u8> {
        serde_json::to_vec(&alice()).unwrap()
    }

    fn accessor(
        reader: MockUserReader,
        writer: MockUserWriter,
        cache: MockCacheService,
    ) -> UserAccessor {
        UserAccessor::new(
            Arc::new(reader),
            Arc::new(writer),
            Arc::new(cache),
            AccessorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_read_hit_skips_store() {
        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .withf(|key| key == "42")
            .times(1)
            .returning(|_| Ok(Some(alice_bytes())));
        cache.expect_set().times(0);

        let mut reader = MockUserReader::new();
        reader.expect_find_by_id().times(0);

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        let user = accessor.read("42").await.unwrap();
        assert_eq!(user, alice());
    }

    #[tokio::test]
    async fn test_read_miss_populates_with_ttl() {
        let mut cache = MockCacheService::new();
        cache.expect_get().times(1).returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(|key, value, ttl| {
                key == "42"
                    && *ttl == Duration::from_secs(60)
                    && serde_json::from_slice::<User>(value).ok() == Some(alice())
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut reader = MockUserReader::new();
        reader
            .expect_find_by_id()
            .withf(|id| id == "42")
            .times(1)
            .returning(|_| Ok(Some(alice())));

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        assert_eq!(accessor.read("42").await.unwrap(), alice());
    }

    #[tokio::test]
    async fn test_read_not_found_is_not_cached() {
        let mut cache = MockCacheService::new();
        cache.expect_get().times(2).returning(|_| Ok(None));
        cache.expect_set().times(0);

        let mut reader = MockUserReader::new();
        reader.expect_find_by_id().times(2).returning(|_| Ok(None));

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        for _ in 0..2 {
            let err = accessor.read("missing").await.unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_read_cache_errors_degrade_to_replica() {
        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .returning(|_| Err(CacheError::ConnectionError("refused".to_string())));
        cache
            .expect_set()
            .returning(|_, _, _| Err(CacheError::ConnectionError("refused".to_string())));

        let mut reader = MockUserReader::new();
        reader
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(alice())));

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        assert_eq!(accessor.read("42").await.unwrap(), alice());
    }

    #[tokio::test]
    async fn test_read_replica_error_propagates() {
        let mut cache = MockCacheService::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().times(0);

        let mut reader = MockUserReader::new();
        reader
            .expect_find_by_id()
            .times(1)
            .returning(|_| Err(AppError::store_unavailable("down", json!({}))));

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        let err = accessor.read("42").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_read_undecodable_entry_is_replaced() {
        let mut cache = MockCacheService::new();
        cache
            .expect_get()
            .times(1)
            .returning(|_| Ok(Some(b"not json".to_vec())));
        cache
            .expect_invalidate()
            .withf(|key| key == "42")
            .times(1)
            .returning(|_| Ok(()));
        cache.expect_set().times(1).returning(|_, _, _| Ok(()));

        let mut reader = MockUserReader::new();
        reader
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(alice())));

        let accessor = accessor(reader, MockUserWriter::new(), cache);

        assert_eq!(accessor.read("42").await.unwrap(), alice());
    }

    #[tokio::test]
    async fn test_update_invalidates_after_primary_success() {
        let mut writer = MockUserWriter::new();
        writer
            .expect_update()
            .withf(|id, patch| id == "42" && patch.name == "Bob")
            .times(1)
            .returning(|id, patch| Ok(User::new(id, patch.name)));

        let mut cache = MockCacheService::new();
        cache
            .expect_invalidate()
            .withf(|key| key == "42")
            .times(1)
            .returning(|_| Ok(()));
        cache.expect_set().times(0);

        let accessor = accessor(MockUserReader::new(), writer, cache);

        let outcome = accessor
            .write("42", WriteOp::Update(UserPatch::new("Bob")))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Updated(User::new("42", "Bob")));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_alone() {
        let mut writer = MockUserWriter::new();
        writer
            .expect_delete()
            .times(1)
            .returning(|id| Err(AppError::not_found("User not found", json!({ "id": id }))));

        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(0);

        let accessor = accessor(MockUserReader::new(), writer, cache);

        let err = accessor.write("42", WriteOp::Delete).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_conflict_is_surfaced() {
        let mut writer = MockUserWriter::new();
        writer
            .expect_insert()
            .times(1)
            .returning(|_| Err(AppError::conflict("User already exists", json!({}))));

        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(0);

        let accessor = accessor(MockUserReader::new(), writer, cache);

        let err = accessor
            .write("42", WriteOp::Insert(NewUser::new("42", "Alice")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_invalid_input_touches_nothing() {
        let mut writer = MockUserWriter::new();
        writer.expect_insert().times(0);
        writer.expect_update().times(0);

        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(0);

        let accessor = accessor(MockUserReader::new(), writer, cache);

        let empty_name = accessor
            .write("42", WriteOp::Update(UserPatch::new("   ")))
            .await;
        assert!(matches!(empty_name, Err(AppError::Validation { .. })));

        let mismatched = accessor
            .write("42", WriteOp::Insert(NewUser::new("43", "Alice")))
            .await;
        assert!(matches!(mismatched, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_invalidation_failure_is_not_surfaced() {
        let mut writer = MockUserWriter::new();
        writer.expect_delete().times(1).returning(|_| Ok(()));

        let mut cache = MockCacheService::new();
        cache
            .expect_invalidate()
            .times(1)
            .returning(|_| Err(CacheError::OperationError("timeout".to_string())));

        let accessor = accessor(MockUserReader::new(), writer, cache);

        assert_eq!(
            accessor.write("42", WriteOp::Delete).await.unwrap(),
            WriteOutcome::Deleted
        );
    }
}
