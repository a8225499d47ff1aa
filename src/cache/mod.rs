// Cache module with in-memory fallback when Redis is not configured

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CacheConfig;

pub mod single_flight;

pub use single_flight::{InflightGuard, InflightRegistry};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    #[error("Cache lock poisoned")]
    LockPoisoned,
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Reads and decodes a JSON payload stored under `key`.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheBackend,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`.
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheBackend,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl).await
}

// In-memory cache implementation
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    capacity: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() >= expires_at)
            .unwrap_or(false)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Bounded cache; once full, expired entries are purged first and then the
    /// entry closest to expiry is evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_for_insert(store: &mut HashMap<String, CacheEntry>, capacity: usize) {
        if store.len() < capacity {
            return;
        }
        store.retain(|_, entry| !entry.is_expired());
        if store.len() < capacity {
            return;
        }
        let victim = store
            .iter()
            .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            store.remove(&key);
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let store = self.store.read().map_err(|_| CacheError::LockPoisoned)?;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        let mut store = self.store.write().map_err(|_| CacheError::LockPoisoned)?;
        if store.get(key).map(CacheEntry::is_expired).unwrap_or(false) {
            store.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().map_err(|_| CacheError::LockPoisoned)?;
        if !store.contains_key(key) {
            Self::evict_for_insert(&mut store, self.capacity);
        }
        store.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.store.write().map_err(|_| CacheError::LockPoisoned)?;
        store.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let store = self.store.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(store.get(key).map(|entry| !entry.is_expired()).unwrap_or(false))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut store = self.store.write().map_err(|_| CacheError::LockPoisoned)?;
        store.clear();
        Ok(())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Redis-backed cache shared between service replicas
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let result: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        match ttl {
            Some(ttl) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl.as_millis().max(1) as u64)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
            None => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let found: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("FLUSHDB")
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

// Cache factory
pub struct CacheFactory;

impl CacheFactory {
    /// Builds the configured backend, falling back to memory when Redis cannot be opened.
    pub fn create_cache(config: &CacheConfig) -> Arc<dyn CacheBackend> {
        if config.is_redis() {
            match RedisCache::new(&config.redis_url) {
                Ok(redis_cache) => {
                    info!("Using Redis dashboard cache");
                    return Arc::new(redis_cache);
                }
                Err(err) => {
                    warn!(error = %err, "Failed to open Redis, falling back to in-memory cache");
                }
            }
        }

        Arc::new(InMemoryCache::with_capacity(config.capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        total: u32,
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(cache.exists("k").await.unwrap());
        cache.delete("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache = InMemoryCache::new();
        cache
            .set("short", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.get("short").await.unwrap().is_none());
        assert!(!cache.exists("short").await.unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_entry_closest_to_expiry() {
        let cache = InMemoryCache::with_capacity(2);
        cache
            .set("soon", "1", Some(Duration::from_secs(5)))
            .await
            .unwrap();
        cache
            .set("later", "2", Some(Duration::from_secs(500)))
            .await
            .unwrap();
        cache
            .set("new", "3", Some(Duration::from_secs(50)))
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("soon").await.unwrap().is_none());
        assert!(cache.get("later").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn json_helpers_encode_and_decode() {
        let cache = InMemoryCache::new();
        let payload = Payload {
            name: "north".into(),
            total: 7,
        };
        set_json(&cache, "p", &payload, None).await.unwrap();
        let back: Option<Payload> = get_json(&cache, "p").await.unwrap();
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn json_helpers_surface_decode_errors() {
        let cache = InMemoryCache::new();
        cache.set("p", "not-json", None).await.unwrap();
        let result: Result<Option<Payload>, _> = get_json(&cache, "p").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn factory_builds_working_memory_backend_by_default() {
        let cache = CacheFactory::create_cache(&CacheConfig::default());
        cache.set("k", "v", Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
