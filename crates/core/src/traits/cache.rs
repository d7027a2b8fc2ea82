//! Key/value cache interface

use async_trait::async_trait;

use crate::Result;

/// TTL-bounded byte cache (Redis in production, in-memory in tests).
///
/// Values are immutable once stored; write races on the same key are
/// tolerated because writers store identical content.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: &[u8]) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
