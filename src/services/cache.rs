use crate::models::{CandidateSourceCounts, Coordinate, Filters, ScoredResult, SearchParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default lifetime of a cached result list
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A fully ranked result list for one (user, location, filters) key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub results: Vec<ScoredResult>,
    pub relaxed: bool,
    pub message: Option<String>,
    pub counts: CandidateSourceCounts,
    pub search_params: SearchParams,
}

impl CacheEntry {
    /// Whether the entry is younger than `ttl` at `now`.
    /// Entries stamped in the future (clock skew) count as fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.created_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

/// Storage for ranked result lists.
///
/// Concurrent writers for the same key may race; the last write wins, which
/// is fine because recomputation for a key is deterministic.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError>;

    async fn put(&self, entry: Arc<CacheEntry>) -> Result<(), CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache backed by moka
pub struct MemoryCache {
    entries: moka::future::Cache<String, Arc<CacheEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: moka::future::CacheBuilder::new(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1000, DEFAULT_TTL)
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        Ok(self.entries.get(key).await)
    }

    async fn put(&self, entry: Arc<CacheEntry>) -> Result<(), CacheError> {
        self.entries.insert(entry.key.clone(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances.
pub struct TieredCache {
    // Store ConnectionManager in a Mutex for interior mutability
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Arc<CacheEntry>>,
    ttl_secs: u64,
}

impl TieredCache {
    /// Create a new cache manager
    pub async fn new(redis_url: &str, l1_size: u64, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(ttl)
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
            ttl_secs: ttl.as_secs().max(1),
        })
    }
}

#[async_trait]
impl ResultCache for TieredCache {
    /// Get a value from cache (L1 first, then L2)
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        if let Some(entry) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(entry));
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        let Some(json) = value else {
            tracing::trace!("Cache miss: {}", key);
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry>(&json) {
            Ok(entry) => {
                tracing::trace!("L2 cache hit: {}", key);
                let entry = Arc::new(entry);
                self.l1_cache.insert(key.to_string(), Arc::clone(&entry)).await;
                Ok(Some(entry))
            }
            Err(e) => {
                // A payload we cannot read is as good as absent
                tracing::warn!("Discarding malformed cache payload for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Set a value in cache (both L1 and L2)
    async fn put(&self, entry: Arc<CacheEntry>) -> Result<(), CacheError> {
        let json = serde_json::to_string(entry.as_ref())?;
        let key = entry.key.clone();

        self.l1_cache.insert(key.clone(), entry).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a full ranked result list.
    ///
    /// The coordinate is rounded to 4 decimal places (~11m) so jitter in the
    /// caller's location still hits the same entry.
    pub fn recommendations(user_id: Option<&str>, location: &Coordinate, filters: &Filters) -> String {
        let user = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or("anonymous");

        format!(
            "recs:v1:{}:{:.4}:{:.4}:{}",
            user,
            round4(location.lat),
            round4(location.lon),
            Self::filters(filters)
        )
    }

    /// Canonical text form of a filter set
    pub fn filters(filters: &Filters) -> String {
        let fees = filters
            .max_fees
            .map(|f| f.to_string())
            .unwrap_or_else(|| "none".to_string());

        format!(
            "d={}|f={}|r={}|m={}",
            filters.max_distance_km,
            fees,
            filters.min_rating,
            String::from(filters.medium.clone())
        )
    }
}

/// Round to 4 decimals and fold -0.0 into 0.0
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0 + 0.0
}
