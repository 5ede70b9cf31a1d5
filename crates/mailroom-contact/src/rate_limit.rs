//! Per-IP submission rate limiting over a shared counter store
//!
//! The counter store is externally owned (keyed value with TTL) so
//! multiple service instances share one view of the window. Redis backs
//! production; the in-memory store backs tests and single-node setups.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailroom_core::Clock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::ContactError;

/// Keyed counter with expiry
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, creating it with the given TTL,
    /// and return the post-increment count. Exact-once semantics are not
    /// required; one extra allowed request under a race is acceptable.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, ContactError>;
}

/// In-process counter store with clock-driven expiry
pub struct MemoryCounterStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (u64, DateTime<Utc>)>>,
}

impl MemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, ContactError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let expires_at = now
            + chrono::Duration::from_std(ttl)
                .map_err(|e| ContactError::CounterStore(e.to_string()))?;

        let entry = entries.entry(key.to_string()).or_insert((0, expires_at));
        if entry.1 <= now {
            // Window expired, start a fresh one
            *entry = (0, expires_at);
        }
        entry.0 += 1;

        Ok(entry.0)
    }
}

/// Redis-backed counter store shared across instances
pub struct RedisCounterStore {
    connection: redis::aio::ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str) -> Result<Self, ContactError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| ContactError::CounterStore(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| ContactError::CounterStore(e.to_string()))?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, ContactError> {
        let mut conn = self.connection.clone();

        let count: u64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| ContactError::CounterStore(e.to_string()))?;

        // First hit in the window sets the expiry
        if count == 1 {
            let result: Result<i64, redis::RedisError> = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl.as_secs())
                .query_async(&mut conn)
                .await;
            if let Err(e) = result {
                warn!("Failed to set TTL on rate-limit key {}: {}", key, e);
            }
        }

        Ok(count)
    }
}

/// Per-IP submission gate
pub struct RateLimitService {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
}

impl RateLimitService {
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Register an attempt from this IP; reject when the window is full.
    /// A permitted attempt has already consumed one slot on return.
    pub async fn check(&self, ip_address: &str) -> Result<(), ContactError> {
        let key = format!("contact_form_rate_limit:{}", ip_address);
        let count = self.store.increment(&key, self.window).await?;

        if count > self.limit {
            debug!(
                "Rate limit exceeded for {} ({} attempts in window)",
                ip_address, count
            );
            return Err(ContactError::RateLimited);
        }

        Ok(())
    }
}
