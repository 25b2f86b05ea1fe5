use async_trait::async_trait;
use cinema_core::identity::{codes, IdentityProvider, OAuthProvider, ProviderError, ProviderSession, RefreshedTokens};
use cinema_shared::Masked;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Identity provider speaking the Identity Toolkit REST protocol
/// (email/password, federated sign-in, password reset, token refresh).
pub struct IdentityToolkitProvider {
    client: Client,
    api_key: String,
    base_url: String,
    token_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
}

impl AccountResponse {
    fn into_session(self, fallback_email: &str) -> ProviderSession {
        ProviderSession {
            uid: self.local_id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            display_name: self.display_name.filter(|name| !name.is_empty()),
            role_hint: None,
            id_token: Masked(self.id_token),
            refresh_token: Masked(self.refresh_token),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
}

impl IdentityToolkitProvider {
    pub fn new(api_key: &str, base_url: &str, token_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::new(codes::INTERNAL, e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(codes::NETWORK_FAILED, e.to_string()))?;

        if !response.status().is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN")
                .to_string();
            debug!("Identity provider rejected request: {}", message);
            return Err(ProviderError::new(map_error_message(&message), message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::new(codes::INTERNAL, e.to_string()))
    }

    async fn accounts<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, ProviderError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        self.call(&url, body).await
    }
}

/// Translates Identity Toolkit error messages (`EMAIL_NOT_FOUND`,
/// `WEAK_PASSWORD : Password should be ...`) into provider error codes.
pub fn map_error_message(message: &str) -> &'static str {
    let key = message.split(" : ").next().unwrap_or(message).trim();
    match key {
        "EMAIL_NOT_FOUND" => codes::USER_NOT_FOUND,
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => codes::INVALID_CREDENTIAL,
        "EMAIL_EXISTS" => codes::EMAIL_IN_USE,
        "WEAK_PASSWORD" => codes::WEAK_PASSWORD,
        "INVALID_EMAIL" | "MISSING_EMAIL" => codes::INVALID_EMAIL,
        "USER_DISABLED" => codes::USER_DISABLED,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => codes::TOO_MANY_REQUESTS,
        "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => codes::OPERATION_NOT_ALLOWED,
        "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => codes::TOKEN_EXPIRED,
        _ => codes::INTERNAL,
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        let account: AccountResponse = self
            .accounts(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(account.into_session(email))
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider, credential: &str) -> Result<ProviderSession, ProviderError> {
        if credential.trim().is_empty() {
            return Err(ProviderError::new(codes::POPUP_CLOSED, "empty oauth credential"));
        }
        let post_body = idp_post_body(provider, credential)?;
        let account: AccountResponse = self
            .accounts(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                    "returnIdpCredential": true
                }),
            )
            .await?;
        Ok(account.into_session(""))
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, ProviderError> {
        let account: AccountResponse = self
            .accounts(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let mut session = account.into_session(email);

        if let Some(name) = display_name.filter(|name| !name.trim().is_empty()) {
            self.update_profile(session.id_token.as_str(), name).await?;
            session.display_name = Some(name.to_string());
        }
        info!("Registered identity account {}", session.uid);
        Ok(session)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let _: Value = self
            .accounts("sendOobCode", json!({ "requestType": "PASSWORD_RESET", "email": email }))
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id_token: &str, display_name: &str) -> Result<(), ProviderError> {
        let _: Value = self
            .accounts(
                "update",
                json!({ "idToken": id_token, "displayName": display_name, "returnSecureToken": false }),
            )
            .await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError> {
        let tokens: TokenResponse = self
            .call(
                &self.token_url,
                json!({ "grant_type": "refresh_token", "refresh_token": refresh_token }),
            )
            .await?;
        Ok(RefreshedTokens {
            id_token: Masked(tokens.id_token),
            refresh_token: Masked(tokens.refresh_token),
        })
    }

    async fn sign_out(&self, _id_token: &str) -> Result<(), ProviderError> {
        // Identity Toolkit tokens are stateless; dropping them locally is the sign-out.
        Ok(())
    }
}

/// Form-encoded `postBody` for `signInWithIdp`.
fn idp_post_body(provider: OAuthProvider, credential: &str) -> Result<String, ProviderError> {
    let field = match provider {
        OAuthProvider::Google => "id_token",
        OAuthProvider::Facebook => "access_token",
    };
    serde_urlencoded::to_string(&[(field, credential), ("providerId", provider.provider_id())])
        .map_err(|e| ProviderError::new(codes::INTERNAL, format!("Failed to encode postBody: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> IdentityToolkitProvider {
        IdentityToolkitProvider::new(
            "test-key",
            &server.uri(),
            &format!("{}/token", server.uri()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_error_message_mapping() {
        assert_eq!(map_error_message("EMAIL_NOT_FOUND"), codes::USER_NOT_FOUND);
        assert_eq!(
            map_error_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            codes::WEAK_PASSWORD
        );
        assert_eq!(map_error_message("SOMETHING_ELSE"), codes::INTERNAL);
    }

    #[test]
    fn test_idp_post_body_is_form_encoded() {
        assert_eq!(
            idp_post_body(OAuthProvider::Google, "a.b&providerId=evil").unwrap(),
            "id_token=a.b%26providerId%3Devil&providerId=google.com"
        );
        assert_eq!(
            idp_post_body(OAuthProvider::Facebook, "tok+en").unwrap(),
            "access_token=tok%2Ben&providerId=facebook.com"
        );
    }

    #[tokio::test]
    async fn test_oauth_sign_in_sends_encoded_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithIdp"))
            .and(body_partial_json(json!({
                "postBody": "id_token=x%3Dy&providerId=google.com",
                "requestUri": "http://localhost"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-9",
                "email": "ana@gmail.com",
                "idToken": "id-9",
                "refreshToken": "ref-9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server).sign_in_with_oauth(OAuthProvider::Google, "x=y").await.unwrap();
        assert_eq!(session.uid, "uid-9");
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({ "email": "ana@cine.pe", "returnSecureToken": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "ana@cine.pe",
                "displayName": "",
                "idToken": "id-1",
                "refreshToken": "ref-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server).sign_in_with_password("ana@cine.pe", "secreto1").await.unwrap();
        assert_eq!(session.uid, "uid-1");
        assert_eq!(session.display_name, None);
        assert_eq!(session.refresh_token.as_str(), "ref-1");
    }

    #[tokio::test]
    async fn test_rejection_maps_to_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
            })))
            .mount(&server)
            .await;

        let err = provider(&server).sign_in_with_password("ana@cine.pe", "x").await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_CREDENTIAL);
    }

    #[tokio::test]
    async fn test_refresh_uses_token_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_partial_json(json!({ "grant_type": "refresh_token", "refresh_token": "ref-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id-2",
                "refresh_token": "ref-2",
                "expires_in": "3600"
            })))
            .mount(&server)
            .await;

        let tokens = provider(&server).refresh("ref-1").await.unwrap();
        assert_eq!(tokens.id_token.as_str(), "id-2");
        assert_eq!(tokens.refresh_token.as_str(), "ref-2");
    }
}
