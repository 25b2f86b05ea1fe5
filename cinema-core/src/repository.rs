use async_trait::async_trait;
use cinema_shared::{Cinema, CinemaDraft, Movie, MovieDraft, Role};
use serde_json::Value;

use crate::BackendError;

/// Read access to the movie catalog
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    async fn list_movies(&self) -> Result<Vec<Movie>, BackendError>;

    async fn get_movie(&self, id: &str) -> Result<Movie, BackendError>;

    /// Implementations must not call the backend for queries rejected by
    /// [`crate::search::is_searchable`].
    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>, BackendError>;
}

/// Movie licensing and cinema management for the admin panels
#[async_trait]
pub trait AdminCatalog: Send + Sync {
    async fn create_movie(&self, token: &str, draft: &MovieDraft) -> Result<Movie, BackendError>;

    async fn update_movie(&self, token: &str, id: &str, draft: &MovieDraft) -> Result<Movie, BackendError>;

    async fn delete_movie(&self, token: &str, id: &str) -> Result<(), BackendError>;

    async fn list_cinemas(&self, token: &str) -> Result<Vec<Cinema>, BackendError>;

    async fn create_cinema(&self, token: &str, draft: &CinemaDraft) -> Result<Cinema, BackendError>;
}

/// Backend side of authentication: role lookup and logout notification
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges a provider id token for the backend's view of the user.
    /// `Ok(None)` means the backend answered without a recognisable role.
    async fn exchange_token(&self, id_token: &str) -> Result<Option<Role>, BackendError>;

    async fn notify_logout(&self, token: &str) -> Result<(), BackendError>;
}

/// Extracts a role from a backend auth response.
///
/// Tolerated shapes, at the top level or nested under `user`:
/// `role: "ADMIN"`, `roles: ["ADMIN"]`, `authorities: ["ROLE_ADMIN"]` and
/// `authorities: [{"authority": "ROLE_ADMIN"}]`. When several roles are
/// present the highest one wins.
pub fn role_from_response(body: &Value) -> Option<Role> {
    let mut candidates: Vec<Role> = Vec::new();

    for scope in [Some(body), body.get("user")].into_iter().flatten() {
        if let Some(role) = scope.get("role").and_then(Value::as_str).and_then(Role::from_claim) {
            candidates.push(role);
        }
        for key in ["roles", "authorities"] {
            if let Some(entries) = scope.get(key).and_then(Value::as_array) {
                candidates.extend(entries.iter().filter_map(|entry| {
                    let claim = entry
                        .as_str()
                        .or_else(|| entry.get("authority").and_then(Value::as_str))
                        .or_else(|| entry.get("name").and_then(Value::as_str))?;
                    Role::from_claim(claim)
                }));
            }
        }
    }

    candidates.into_iter().max()
}
