use async_trait::async_trait;
use cinema_shared::{Masked, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Error codes shared by every identity provider implementation.
pub mod codes {
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const EMAIL_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const USER_DISABLED: &str = "auth/user-disabled";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const POPUP_CLOSED: &str = "auth/popup-closed-by-user";
    pub const OPERATION_NOT_ALLOWED: &str = "auth/operation-not-allowed";
    pub const TOKEN_EXPIRED: &str = "auth/user-token-expired";
    pub const NETWORK_FAILED: &str = "auth/network-request-failed";
    pub const INTERNAL: &str = "auth/internal-error";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Identity provider error [{code}]: {detail}")]
pub struct ProviderError {
    pub code: String,
    pub detail: String,
}

impl ProviderError {
    pub fn new(code: &str, detail: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    /// Provider id as understood by the identity service.
    pub fn provider_id(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google.com",
            OAuthProvider::Facebook => "facebook.com",
        }
    }
}

/// Result of a successful sign-in or registration.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Role carried by the sign-in response itself, when the provider knows it.
    pub role_hint: Option<Role>,
    pub id_token: Masked<String>,
    pub refresh_token: Masked<String>,
}

/// Fresh tokens obtained from a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub id_token: Masked<String>,
    pub refresh_token: Masked<String>,
}

/// Third-party identity provider (email/password and social login).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError>;

    /// `credential` is the provider's OAuth id token or access token.
    async fn sign_in_with_oauth(&self, provider: OAuthProvider, credential: &str) -> Result<ProviderSession, ProviderError>;

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn update_profile(&self, id_token: &str, display_name: &str) -> Result<(), ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError>;

    async fn sign_out(&self, id_token: &str) -> Result<(), ProviderError>;
}

struct MockAccount {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// In-memory identity provider used for local development and tests.
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: RwLock<HashMap<String, MockAccount>>,
    // id token -> email
    sessions: RwLock<HashMap<String, String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-registers an account.
    pub async fn with_account(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        self.accounts.write().await.insert(
            email.to_ascii_lowercase(),
            MockAccount {
                uid: Uuid::new_v4().simple().to_string(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
            },
        );
        self
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn open_session(&self, email: &str, uid: &str, display_name: Option<String>) -> ProviderSession {
        let id_token = format!("mock-id-{}", Uuid::new_v4().simple());
        self.sessions.write().await.insert(id_token.clone(), email.to_string());
        ProviderSession {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name,
            role_hint: None,
            id_token: Masked(id_token),
            refresh_token: Masked(format!("mock-refresh-{}", Uuid::new_v4().simple())),
        }
    }
}

fn validate_email(email: &str) -> Result<String, ProviderError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ProviderError::new(codes::INVALID_EMAIL, "malformed email address")),
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        let email = validate_email(email)?;
        let (uid, display_name) = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&email)
                .ok_or_else(|| ProviderError::new(codes::USER_NOT_FOUND, "no account for email"))?;
            if account.password != password {
                return Err(ProviderError::new(codes::WRONG_PASSWORD, "password mismatch"));
            }
            (account.uid.clone(), account.display_name.clone())
        };
        tracing::debug!("Mock provider sign-in for {}", email);
        Ok(self.open_session(&email, &uid, display_name).await)
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider, credential: &str) -> Result<ProviderSession, ProviderError> {
        if credential.trim().is_empty() {
            return Err(ProviderError::new(codes::POPUP_CLOSED, "empty oauth credential"));
        }
        // Mock credentials are the federated email itself.
        let email = validate_email(credential)?;
        let uid = format!("{}:{}", provider.provider_id(), email);
        Ok(self.open_session(&email, &uid, None).await)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, ProviderError> {
        let email = validate_email(email)?;
        if password.len() < 6 {
            return Err(ProviderError::new(codes::WEAK_PASSWORD, "password shorter than 6 characters"));
        }
        let uid = Uuid::new_v4().simple().to_string();
        {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(ProviderError::new(codes::EMAIL_IN_USE, "account exists"));
            }
            accounts.insert(
                email.clone(),
                MockAccount {
                    uid: uid.clone(),
                    password: password.to_string(),
                    display_name: display_name.map(str::to_string),
                },
            );
        }
        Ok(self.open_session(&email, &uid, display_name.map(str::to_string)).await)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let email = validate_email(email)?;
        if !self.accounts.read().await.contains_key(&email) {
            return Err(ProviderError::new(codes::USER_NOT_FOUND, "no account for email"));
        }
        tracing::info!("Mock provider password reset requested for {}", email);
        Ok(())
    }

    async fn update_profile(&self, id_token: &str, display_name: &str) -> Result<(), ProviderError> {
        let email = self
            .sessions
            .read()
            .await
            .get(id_token)
            .cloned()
            .ok_or_else(|| ProviderError::new(codes::TOKEN_EXPIRED, "unknown id token"))?;
        if let Some(account) = self.accounts.write().await.get_mut(&email) {
            account.display_name = Some(display_name.to_string());
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError> {
        if !refresh_token.starts_with("mock-refresh-") {
            return Err(ProviderError::new(codes::TOKEN_EXPIRED, "unknown refresh token"));
        }
        Ok(RefreshedTokens {
            id_token: Masked(format!("mock-id-{}", Uuid::new_v4().simple())),
            refresh_token: Masked(refresh_token.to_string()),
        })
    }

    async fn sign_out(&self, id_token: &str) -> Result<(), ProviderError> {
        self.sessions.write().await.remove(id_token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sign_in_and_errors() {
        let provider = MockIdentityProvider::new()
            .with_account("ana@cine.pe", "secreto1", Some("Ana"))
            .await;

        let session = provider.sign_in_with_password("ANA@cine.pe", "secreto1").await.unwrap();
        assert_eq!(session.email, "ana@cine.pe");
        assert_eq!(session.display_name.as_deref(), Some("Ana"));

        let err = provider.sign_in_with_password("ana@cine.pe", "nope").await.unwrap_err();
        assert_eq!(err.code, codes::WRONG_PASSWORD);

        let err = provider.sign_in_with_password("nadie@cine.pe", "x").await.unwrap_err();
        assert_eq!(err.code, codes::USER_NOT_FOUND);

        let err = provider.sign_in_with_password("not-an-email", "x").await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_EMAIL);
    }

    #[tokio::test]
    async fn test_mock_register_and_sign_out() {
        let provider = MockIdentityProvider::new();
        let session = provider.register("luis@cine.pe", "abcdef", None).await.unwrap();
        assert_eq!(provider.active_sessions().await, 1);

        let dup = provider.register("luis@cine.pe", "abcdef", None).await.unwrap_err();
        assert_eq!(dup.code, codes::EMAIL_IN_USE);

        let weak = provider.register("eva@cine.pe", "123", None).await.unwrap_err();
        assert_eq!(weak.code, codes::WEAK_PASSWORD);

        provider.sign_out(session.id_token.as_str()).await.unwrap();
        assert_eq!(provider.active_sessions().await, 0);
    }
}
