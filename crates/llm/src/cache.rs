//! Redis K/V cache

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use sherlock_core::{Error, KvCache, Result};

use crate::LlmError;

/// Redis-backed byte cache with TTL semantics
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect and build a managed connection (auto-reconnecting)
    pub async fn connect(url: &str) -> std::result::Result<Self, LlmError> {
        let client =
            redis::Client::open(url).map_err(|e| LlmError::Cache(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| LlmError::Cache(e.to_string()))?;
        tracing::info!(url, "Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(Error::Cache(format!("unexpected ping reply: {pong}")))
        }
    }
}
