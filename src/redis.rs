use std::sync::Arc;

use deadpool::managed::QueueMode;
use deadpool_redis::{Config as DeadpoolConfig, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;

use crate::error::{Result, WorkchatError};

/// Pooled Redis connection manager for the chat history backend.
#[derive(Clone)]
pub struct RedisManager {
    pool: Arc<Pool>,
    default_ttl_seconds: i64,
}

impl RedisManager {
    /// Create a new Redis manager with configuration
    pub async fn new_with_config(config: &crate::config::Config) -> Result<Self> {
        let redis_url = config.get_redis_url();

        tracing::info!(
            "Connecting to Redis at {}:{} (db: {})",
            config.history.redis.host,
            config.history.redis.port,
            config.history.redis.database
        );

        // Configure the connection pool with settings from config
        let mut cfg = DeadpoolConfig::from_url(&redis_url);
        cfg.pool = Some(PoolConfig {
            max_size: config.history.redis.pool.max_size,
            timeouts: Timeouts {
                wait: Some(config.get_pool_timeout()),
                create: Some(config.get_pool_create_timeout()),
                recycle: Some(config.get_pool_recycle_timeout()),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| WorkchatError::PoolCreation(e.to_string()))?;

        // Test the connection
        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Redis connection established");

        Ok(Self {
            pool: Arc::new(pool),
            default_ttl_seconds: config.history.redis.default_ttl_seconds,
        })
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    /// Store a serializable value as a JSON string with the default TTL.
    pub async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.get_connection().await?;
        conn.set::<_, _, ()>(key, json).await?;
        conn.expire::<_, ()>(key, self.default_ttl_seconds).await?;
        Ok(())
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    /// Add or update a member in a sorted set.
    pub async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.zrem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    /// Members of a sorted set from highest score to lowest.
    pub async fn zrevrange_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        Ok(conn.zrevrange(key, 0, -1).await?)
    }
}
