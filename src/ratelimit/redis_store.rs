use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;

use super::store::{CounterStore, StoreError};

/// Redis-backed counters over a multiplexed, auto-reconnecting connection
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| StoreError::Connection(format!("redis client: {err}")))?;

        let manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Connection(format!("redis connect timed out after {:?}", timeout)))?
            .map_err(|err| StoreError::Connection(format!("redis connect: {err}")))?;

        Ok(Self { manager })
    }
}

fn classify(op: &str, err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Command(format!("redis {op} timed out: {err}"))
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        StoreError::Connection(format!("redis {op}: {err}"))
    } else {
        StoreError::Command(format!("redis {op}: {err}"))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1).await.map_err(|err| classify("incr", err))?;
        Ok(count.max(0) as u64)
    }

    async fn expire(&self, key: &str, secs: u64) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.expire::<_, ()>(key, secs as i64)
            .await
            .map_err(|err| classify("expire", err))
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.manager.clone();
        let ttl: i64 = conn.ttl(key).await.map_err(|err| classify("ttl", err))?;
        // -1 = no expiry, -2 = missing key
        Ok((ttl >= 0).then_some(ttl as u64))
    }
}
