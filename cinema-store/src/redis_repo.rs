use async_trait::async_trait;
use cinema_core::storage::SessionStorage;
use cinema_core::StorageError;
use redis::AsyncCommands;
use tracing::debug;

/// Session storage backed by one Redis hash per session (`session:{sid}`).
#[derive(Clone)]
pub struct RedisStorage {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisStorage {
    pub fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)
    }
}

fn session_key(sid: &str) -> String {
    format!("session:{}", sid)
}

fn backend_error(err: redis::RedisError) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl SessionStorage for RedisStorage {
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.hget(session_key(sid), key).await.map_err(backend_error)?;
        Ok(value)
    }

    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let hash = session_key(sid);

        // Every write slides the session expiry forward.
        let _: () = redis::pipe()
            .atomic()
            .hset(&hash, key, value)
            .ignore()
            .expire(&hash, self.ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;

        debug!("Session {} stored {}", sid, key);
        Ok(())
    }

    async fn remove(&self, sid: &str, keys: &[&str]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.hdel::<_, _, ()>(session_key(sid), keys).await.map_err(backend_error)?;
        debug!("Session {} removed {:?}", sid, keys);
        Ok(())
    }
}
