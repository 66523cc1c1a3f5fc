//! Key-Value Source Adapter: abstracts the upstream store the gateway
//! writes request/response payloads into.

mod redis_store;

pub use redis_store::RedisKvStore;

use async_trait::async_trait;

use crate::error::Result;

/// Progressive enumeration and point/batch reads over the upstream store.
///
/// Grounded on `lightseekorg-smg`'s `data_connector` storage traits (one
/// trait per storage concern, implemented for a concrete Redis backend);
/// this crate needs only the read-side subset the puller actually uses.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// `cursor == 0` both starts and (on return) ends a full enumeration.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Same length and order as `keys`. Implementations should fall back to
    /// per-key `get` if the batched form fails.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;
}
