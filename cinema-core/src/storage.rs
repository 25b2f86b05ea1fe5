use async_trait::async_trait;

use crate::StorageError;

/// Fixed keys of the per-session store.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER: &str = "user";
    pub const BOOKING: &str = "booking";
    pub const THEME: &str = "theme";

    /// Everything the auth context owns; removed together on logout.
    pub const AUTH: [&str; 3] = [TOKEN, REFRESH_TOKEN, USER];
}

/// String key/value store namespaced by session id.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, sid: &str, keys: &[&str]) -> Result<(), StorageError>;
}
