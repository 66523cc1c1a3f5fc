use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use super::KvStore;
use crate::error::Result;

/// Redis-backed implementation of [`KvStore`].
///
/// Grounded on `lightseekorg-smg/data_connector/src/redis.rs`'s
/// `RedisStore` wrapper; this crate has no need for a connection pool since
/// a single worker issues requests sequentially, so a single
/// [`ConnectionManager`] (which reconnects transparently) stands in for the
/// `deadpool_redis::Pool` that repo uses.
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisKvStore { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next_cursor, keys))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        match conn.mget(keys).await {
            Ok(values) => Ok(values),
            Err(err) => {
                tracing::warn!(error = %err, "mget failed, falling back to per-key get");
                let mut values = Vec::with_capacity(keys.len());
                for key in keys {
                    let value = self.get(key).await.unwrap_or_else(|err| {
                        tracing::warn!(key = %key, error = %err, "get failed during mget fallback, treating as absent");
                        None
                    });
                    values.push(value);
                }
                Ok(values)
            }
        }
    }
}
