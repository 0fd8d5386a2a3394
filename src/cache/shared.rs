// Shared cache store backed by Redis.
// Expiry and atomic counters are delegated to the server.

use std::fmt;
use std::time::Duration;

use redis::{AsyncCommands, Client, aio::ConnectionManager};

use crate::error::{MemoError, Result};

use super::key::CacheKey;

/// Redis adapter.
///
/// Holds no local state beyond a multiplexed connection, which is cheap to
/// clone and shared by every caller.
#[derive(Clone)]
pub struct SharedStore {
    conn: ConnectionManager,
    url: String,
}

impl SharedStore {
    /// Connect to `url` and verify the server answers `PING` within `timeout`.
    ///
    /// Any failure is reported as [`MemoError::BackendUnavailable`].
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| MemoError::BackendUnavailable(format!("{}: {}", url, e)))?;

        let probe = async {
            let mut conn = ConnectionManager::new(client).await?;
            ping(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(conn)) => Ok(Self {
                conn,
                url: url.to_string(),
            }),
            Ok(Err(e)) => Err(MemoError::BackendUnavailable(format!("{}: {}", url, e))),
            Err(_) => Err(MemoError::BackendUnavailable(format!(
                "{}: no reply within {:?}",
                url, timeout
            ))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key.result_key()).await?;
        Ok(value)
    }

    pub async fn set_with_expiry(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // PX rejects zero, so sub-millisecond TTLs round up.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn.pset_ex(key.result_key(), value, millis).await?;
        Ok(())
    }

    pub async fn increment_counter(&self, key: &CacheKey) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key.count_key(), 1u64).await?;
        Ok(count)
    }

    pub async fn request_count(&self, key: &CacheKey) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(key.count_key()).await?;
        Ok(count.unwrap_or(0))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Liveness check used by the startup probe.
async fn ping(conn: &mut ConnectionManager) -> redis::RedisResult<()> {
    let _: String = redis::cmd("PING").query_async(conn).await?;
    Ok(())
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore").field("url", &self.url).finish()
    }
}
