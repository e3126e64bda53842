//! Token validity store.
//!
//! Issued tokens are registered here with a TTL; a token that passes JWT
//! validation is still rejected unless the store says it is live. This is
//! what makes revocation (logout) effective before the JWT itself expires.
//!
//! Two backends: [`MemoryStore`] for single-process deployments and tests,
//! [`RedisStore`] for anything shared. Both are idempotent on `set` and
//! `delete`.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use metrics::counter;
use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Capability Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Backend-agnostic token validity store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Register a token as valid for `ttl`. Re-registering refreshes the TTL.
    async fn set(&self, token: &str, ttl: Duration) -> Result<()>;

    /// Whether the token is currently live. Absent or expired tokens return
    /// `Ok(false)`; `Err` means the backend itself failed.
    async fn check(&self, token: &str) -> Result<bool>;

    /// Remove a token. Removing an absent token is not an error.
    async fn delete(&self, token: &str) -> Result<()>;

    /// Release backend resources.
    async fn close(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-local store. Entries evaporate on restart, which is acceptable:
/// clients simply re-authenticate.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Instant>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries. Test and introspection helper.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| *e.value() > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        self.entries.insert(token.to_string(), Instant::now() + ttl);
        counter!("gatekit_token_store_ops_total", "backend" => "memory", "op" => "set")
            .increment(1);
        Ok(())
    }

    async fn check(&self, token: &str) -> Result<bool> {
        // Lazy eviction: expired entries are dropped on observation.
        if let Some(entry) = self.entries.get(token) {
            if *entry.value() > Instant::now() {
                return Ok(true);
            }
            drop(entry);
            self.entries.remove(token);
        }
        Ok(false)
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.entries.remove(token);
        counter!("gatekit_token_store_ops_total", "backend" => "memory", "op" => "delete")
            .increment(1);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Redis Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Redis-backed store. Values carry no payload; presence of the key is the
/// liveness signal and Redis owns the expiry.
pub struct RedisStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisStore {
    /// Connect lazily; the first operation establishes the connection.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl TokenStore for RedisStore {
    async fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.key(token), 1u8, ttl_secs).await?;
        counter!("gatekit_token_store_ops_total", "backend" => "redis", "op" => "set")
            .increment(1);
        Ok(())
    }

    async fn check(&self, token: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(self.key(token)).await?;
        Ok(exists)
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(self.key(token)).await?;
        counter!("gatekit_token_store_ops_total", "backend" => "redis", "op" => "delete")
            .increment(1);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Connections are per-operation; nothing held open.
        debug!("redis token store released");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
