//! Item cache - TTL-bounded Redis entries keyed by item id
//!
//! Key pattern:
//!
//! ```text
//! item_{id} -> serialized item representation (expires after CACHE_TTL_SECS)
//! ```
//!
//! The item store stays authoritative. Callers treat every cache failure as
//! a miss and fall back to the store; a cache outage degrades latency, never
//! correctness.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Derive the cache key for an item id
pub fn item_key(id: i64) -> String {
    format!("item_{}", id)
}

/// Key-value cache for serialized item representations
#[async_trait]
pub trait ItemCache: Send + Sync {
    /// Fetch a cached value, `None` on miss
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value with a time-to-live in seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Drop a cached value; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Redis-backed item cache
///
/// The connection manager multiplexes over one connection and reconnects on
/// failure, so the handle is cheap to clone into handlers.
#[derive(Clone)]
pub struct RedisItemCache {
    conn: ConnectionManager,
}

impl RedisItemCache {
    /// Connect to Redis at the configured URL
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ItemCache for RedisItemCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
