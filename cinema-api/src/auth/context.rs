use cinema_core::identity::{IdentityProvider, OAuthProvider, ProviderError, ProviderSession};
use cinema_core::messages::{localize, Locale};
use cinema_core::repository::AuthBackend;
use cinema_core::storage::{keys, SessionStorage};
use cinema_shared::{Role, UserRecord};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppError;

/// Wraps the identity provider and owns the `token`, `refreshToken` and
/// `user` entries of a session.
#[derive(Clone)]
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn SessionStorage>,
    resolve_roles: bool,
    locale: Locale,
}

impl AuthContext {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn SessionStorage>,
        resolve_roles: bool,
        locale: Locale,
    ) -> Self {
        Self {
            provider,
            backend,
            storage,
            resolve_roles,
            locale,
        }
    }

    fn provider_error(&self, err: ProviderError) -> AppError {
        warn!("Identity provider error: {}", err);
        AppError::ProviderError {
            message: localize(&err.code, self.locale).to_string(),
            code: err.code,
        }
    }

    pub async fn sign_in(&self, sid: &str, email: &str, password: &str) -> Result<UserRecord, AppError> {
        let session = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| self.provider_error(e))?;
        self.establish(sid, session).await
    }

    pub async fn sign_in_with_oauth(
        &self,
        sid: &str,
        provider: OAuthProvider,
        credential: &str,
    ) -> Result<UserRecord, AppError> {
        let session = self
            .provider
            .sign_in_with_oauth(provider, credential)
            .await
            .map_err(|e| self.provider_error(e))?;
        self.establish(sid, session).await
    }

    pub async fn register(
        &self,
        sid: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserRecord, AppError> {
        let session = self
            .provider
            .register(email, password, display_name)
            .await
            .map_err(|e| self.provider_error(e))?;
        self.establish(sid, session).await
    }

    async fn resolve_role(&self, session: &ProviderSession) -> Role {
        if let Some(role) = session.role_hint {
            return role;
        }
        if !self.resolve_roles {
            return Role::Customer;
        }
        match self.backend.exchange_token(session.id_token.as_str()).await {
            Ok(Some(role)) => role,
            Ok(None) => Role::Customer,
            Err(e) => {
                warn!("Role exchange failed for {}, defaulting to CUSTOMER: {}", session.uid, e);
                Role::Customer
            }
        }
    }

    async fn establish(&self, sid: &str, session: ProviderSession) -> Result<UserRecord, AppError> {
        let role = self.resolve_role(&session).await;
        let user = UserRecord {
            uid: session.uid,
            email: session.email,
            display_name: session.display_name,
            role,
        };

        let raw = serde_json::to_string(&user).map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.storage.set(sid, keys::TOKEN, session.id_token.as_str()).await?;
        self.storage.set(sid, keys::REFRESH_TOKEN, session.refresh_token.as_str()).await?;
        self.storage.set(sid, keys::USER, &raw).await?;

        info!("User {} signed in as {}", user.uid, user.role.as_str());
        Ok(user)
    }

    /// The stored user. An unreadable record wipes the auth keys.
    pub async fn current_user(&self, sid: &str) -> Result<Option<UserRecord>, AppError> {
        let Some(raw) = self.storage.get(sid, keys::USER).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Stored user for session {} is corrupt, clearing auth: {}", sid, e);
                self.storage.remove(sid, &keys::AUTH).await?;
                Ok(None)
            }
        }
    }

    pub async fn is_logged_in(&self, sid: &str) -> Result<bool, AppError> {
        Ok(self.current_user(sid).await?.is_some())
    }

    pub async fn token(&self, sid: &str) -> Result<Option<String>, AppError> {
        Ok(self.storage.get(sid, keys::TOKEN).await?)
    }

    /// Backend and provider sign-out are best effort; local state is always cleared.
    pub async fn sign_out(&self, sid: &str) -> Result<(), AppError> {
        if let Some(token) = self.token(sid).await.unwrap_or_default() {
            if let Err(e) = self.backend.notify_logout(&token).await {
                warn!("Backend logout failed for session {}: {}", sid, e);
            }
            if let Err(e) = self.provider.sign_out(&token).await {
                warn!("Provider sign-out failed for session {}: {}", sid, e);
            }
        }
        self.storage.remove(sid, &keys::AUTH).await?;
        Ok(())
    }

    pub async fn refresh(&self, sid: &str) -> Result<(), AppError> {
        let refresh_token = self
            .storage
            .get(sid, keys::REFRESH_TOKEN)
            .await?
            .ok_or_else(|| AppError::AuthenticationError("Not signed in".into()))?;

        match self.provider.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.storage.set(sid, keys::TOKEN, tokens.id_token.as_str()).await?;
                self.storage.set(sid, keys::REFRESH_TOKEN, tokens.refresh_token.as_str()).await?;
                Ok(())
            }
            Err(e) => {
                self.storage.remove(sid, &keys::AUTH).await?;
                Err(self.provider_error(e))
            }
        }
    }

    pub async fn update_profile(&self, sid: &str, display_name: &str) -> Result<UserRecord, AppError> {
        let mut user = self
            .current_user(sid)
            .await?
            .ok_or_else(|| AppError::AuthenticationError("Not signed in".into()))?;
        let token = self
            .token(sid)
            .await?
            .ok_or_else(|| AppError::AuthenticationError("Not signed in".into()))?;

        self.provider
            .update_profile(&token, display_name)
            .await
            .map_err(|e| self.provider_error(e))?;

        user.display_name = Some(display_name.to_string());
        let raw = serde_json::to_string(&user).map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.storage.set(sid, keys::USER, &raw).await?;
        Ok(user)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        self.provider
            .send_password_reset(email)
            .await
            .map_err(|e| self.provider_error(e))
    }
}
