use async_trait::async_trait;
use cinema_core::storage::SessionStorage;
use cinema_core::StorageError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct SessionEntry {
    values: HashMap<String, String>,
    written_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, ttl: Duration) -> bool {
        self.written_at.elapsed() < ttl
    }
}

/// Process-local session storage for development and tests.
///
/// Like the Redis store, a session lives for `ttl` after its last write.
/// Expired sessions are invisible to reads and dropped on the next write.
pub struct MemoryStorage {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl MemoryStorage {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Number of keys currently held for a session.
    pub async fn len(&self, sid: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(sid)
            .filter(|entry| entry.is_live(self.ttl))
            .map_or(0, |entry| entry.values.len())
    }

    /// Number of sessions held in memory, expired or not.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(sid)
            .filter(|entry| entry.is_live(self.ttl))
            .and_then(|entry| entry.values.get(key))
            .cloned())
    }

    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| id == sid || entry.is_live(self.ttl));
        if sessions.len() < before {
            debug!("Pruned {} expired sessions", before - sessions.len());
        }

        let now = Instant::now();
        let entry = sessions.entry(sid.to_string()).or_insert_with(|| SessionEntry {
            values: HashMap::new(),
            written_at: now,
        });
        if !entry.is_live(self.ttl) {
            entry.values.clear();
        }
        entry.values.insert(key.to_string(), value.to_string());
        entry.written_at = now;
        Ok(())
    }

    async fn remove(&self, sid: &str, keys: &[&str]) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(sid) {
            for key in keys {
                entry.values.remove(*key);
            }
            if entry.values.is_empty() {
                sessions.remove(sid);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::storage::keys;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let storage = MemoryStorage::new(3600);
        storage.set("s1", keys::TOKEN, "abc").await.unwrap();
        storage.set("s2", keys::TOKEN, "xyz").await.unwrap();

        assert_eq!(storage.get("s1", keys::TOKEN).await.unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.get("s2", keys::TOKEN).await.unwrap().as_deref(), Some("xyz"));
        assert_eq!(storage.get("s1", keys::USER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_auth_keys_keeps_the_rest() {
        let storage = MemoryStorage::new(3600);
        for key in keys::AUTH {
            storage.set("s1", key, "v").await.unwrap();
        }
        storage.set("s1", keys::THEME, "dark").await.unwrap();

        storage.remove("s1", &keys::AUTH).await.unwrap();
        assert_eq!(storage.len("s1").await, 1);
        assert_eq!(storage.get("s1", keys::THEME).await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_expire_after_last_write() {
        let storage = MemoryStorage::new(60);
        storage.set("idle", keys::THEME, "dark").await.unwrap();
        storage.set("active", keys::THEME, "light").await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        storage.set("active", keys::BOOKING, "{}").await.unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(storage.get("idle", keys::THEME).await.unwrap(), None);
        assert_eq!(storage.len("idle").await, 0);
        assert_eq!(storage.get("active", keys::THEME).await.unwrap().as_deref(), Some("light"));

        // The next write sweeps out what has expired.
        assert_eq!(storage.session_count().await, 2);
        storage.set("fresh", keys::THEME, "dark").await.unwrap();
        assert_eq!(storage.session_count().await, 2);
        assert_eq!(storage.get("idle", keys::THEME).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_restarts_empty() {
        let storage = MemoryStorage::new(60);
        storage.set("s1", keys::TOKEN, "old").await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        storage.set("s1", keys::THEME, "dark").await.unwrap();

        assert_eq!(storage.get("s1", keys::TOKEN).await.unwrap(), None);
        assert_eq!(storage.len("s1").await, 1);
    }
}
