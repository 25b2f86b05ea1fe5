use async_trait::async_trait;
use cinema_core::identity::{codes, IdentityProvider, OAuthProvider, ProviderError, ProviderSession, RefreshedTokens};
use cinema_core::repository::{role_from_response, AdminCatalog, AuthBackend, MovieCatalog};
use cinema_core::search::is_searchable;
use cinema_core::BackendError;
use cinema_shared::{Cinema, CinemaDraft, Masked, Movie, MovieDraft, Role};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Client for the cinema chain's REST backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Lists come back bare or wrapped, depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Content { content: Vec<T> },
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Data { data } => data,
            ListEnvelope::Content { content } => content,
        }
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let base_url = Url::parse(base_url).map_err(|e| BackendError::RequestFailed(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::RequestFailed(format!("{} cannot be a base URL", base_url)));
        }

        Ok(Self { client, base_url })
    }

    /// Appends percent-encoded path segments to the base URL, so ids never add path levels.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(BackendError::NotFound(format!("invalid path segment {:?}", bad)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::RequestFailed(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(response.url().path().to_string())),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(BackendError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::ResponseParseFailed(e.to_string()))
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, BackendError> {
        Ok(self.fetch::<ListEnvelope<T>>(request).await?.into_vec())
    }
}

#[async_trait]
impl MovieCatalog for ApiClient {
    async fn list_movies(&self) -> Result<Vec<Movie>, BackendError> {
        self.fetch_list(self.client.get(self.url(&["movies"])?)).await
    }

    async fn get_movie(&self, id: &str) -> Result<Movie, BackendError> {
        self.fetch(self.client.get(self.url(&["movies", id])?)).await
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>, BackendError> {
        if !is_searchable(query) {
            debug!("Skipping movie search for empty query");
            return Ok(Vec::new());
        }
        let request = self
            .client
            .get(self.url(&["movies", "search"])?)
            .query(&[("query", query.trim())]);
        self.fetch_list(request).await
    }
}

#[async_trait]
impl AdminCatalog for ApiClient {
    async fn create_movie(&self, token: &str, draft: &MovieDraft) -> Result<Movie, BackendError> {
        let request = self.client.post(self.url(&["admin", "movies"])?).bearer_auth(token).json(draft);
        self.fetch(request).await
    }

    async fn update_movie(&self, token: &str, id: &str, draft: &MovieDraft) -> Result<Movie, BackendError> {
        let request = self
            .client
            .put(self.url(&["admin", "movies", id])?)
            .bearer_auth(token)
            .json(draft);
        self.fetch(request).await
    }

    async fn delete_movie(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .delete(self.url(&["admin", "movies", id])?)
            .bearer_auth(token);
        self.send(request).await?;
        Ok(())
    }

    async fn list_cinemas(&self, token: &str) -> Result<Vec<Cinema>, BackendError> {
        self.fetch_list(self.client.get(self.url(&["admin", "cinemas"])?).bearer_auth(token)).await
    }

    async fn create_cinema(&self, token: &str, draft: &CinemaDraft) -> Result<Cinema, BackendError> {
        let request = self.client.post(self.url(&["admin", "cinemas"])?).bearer_auth(token).json(draft);
        self.fetch(request).await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn exchange_token(&self, id_token: &str) -> Result<Option<Role>, BackendError> {
        let request = self
            .client
            .post(self.url(&["auth", "firebase"])?)
            .bearer_auth(id_token)
            .json(&json!({ "idToken": id_token }));
        let body: Value = self.fetch(request).await?;
        Ok(role_from_response(&body))
    }

    async fn notify_logout(&self, token: &str) -> Result<(), BackendError> {
        self.send(self.client.post(self.url(&["auth", "logout"])?).bearer_auth(token)).await?;
        Ok(())
    }
}

// ============================================================================
// Backend-native authentication (identity.provider = "backend")
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendAuthResponse {
    #[serde(alias = "accessToken", alias = "idToken")]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

impl BackendAuthResponse {
    fn into_session(self, fallback_email: &str) -> ProviderSession {
        let user = self.user.unwrap_or(Value::Null);
        let uid = match user.get("id").or_else(|| user.get("uid")) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => fallback_email.to_string(),
        };
        let email = user
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(fallback_email)
            .to_string();
        let display_name = user
            .get("displayName")
            .or_else(|| user.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        ProviderSession {
            uid,
            email,
            display_name,
            role_hint: role_from_response(&user),
            id_token: Masked(self.token),
            refresh_token: Masked(self.refresh_token.unwrap_or_default()),
        }
    }
}

fn provider_error(err: BackendError) -> ProviderError {
    let code = match &err {
        BackendError::Unauthorized => codes::INVALID_CREDENTIAL,
        BackendError::NotFound(_) => codes::USER_NOT_FOUND,
        BackendError::Status { status: 409, .. } => codes::EMAIL_IN_USE,
        BackendError::Status { status: 429, .. } => codes::TOO_MANY_REQUESTS,
        BackendError::RequestFailed(_) => codes::NETWORK_FAILED,
        _ => codes::INTERNAL,
    };
    ProviderError::new(code, err.to_string())
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        let request = self
            .client
            .post(self.url(&["auth", "login"]).map_err(provider_error)?)
            .json(&json!({ "email": email, "password": password }));
        let response: BackendAuthResponse = self.fetch(request).await.map_err(provider_error)?;
        Ok(response.into_session(email))
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider, _credential: &str) -> Result<ProviderSession, ProviderError> {
        Err(ProviderError::new(
            codes::OPERATION_NOT_ALLOWED,
            format!("{} sign-in requires an identity provider", provider.provider_id()),
        ))
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, ProviderError> {
        let request = self
            .client
            .post(self.url(&["auth", "register"]).map_err(provider_error)?)
            .json(&json!({ "email": email, "password": password, "name": display_name }));
        let response: BackendAuthResponse = self.fetch(request).await.map_err(provider_error)?;
        Ok(response.into_session(email))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let request = self
            .client
            .post(self.url(&["auth", "reset-password"]).map_err(provider_error)?)
            .json(&json!({ "email": email }));
        self.send(request).await.map_err(provider_error)?;
        Ok(())
    }

    async fn update_profile(&self, _id_token: &str, _display_name: &str) -> Result<(), ProviderError> {
        Err(ProviderError::new(
            codes::OPERATION_NOT_ALLOWED,
            "profile updates are not exposed by the backend",
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError> {
        let request = self
            .client
            .post(self.url(&["auth", "refresh"]).map_err(provider_error)?)
            .json(&json!({ "refreshToken": refresh_token }));
        let response: BackendAuthResponse = self.fetch(request).await.map_err(|err| match err {
            BackendError::Unauthorized => ProviderError::new(codes::TOKEN_EXPIRED, "refresh token rejected"),
            other => provider_error(other),
        })?;
        Ok(RefreshedTokens {
            id_token: Masked(response.token),
            refresh_token: Masked(response.refresh_token.unwrap_or_else(|| refresh_token.to_string())),
        })
    }

    async fn sign_out(&self, _id_token: &str) -> Result<(), ProviderError> {
        // Backend sessions end with notify_logout; nothing is held client-side.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_list_movies_accepts_wrapped_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 1, "title": "Dune", "showtimes": [] },
                    { "id": "m-2", "title": "Alien" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let movies = client(&server).list_movies().await.unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].id, "1");
        assert_eq!(movies[1].title, "Alien");
    }

    #[tokio::test]
    async fn test_empty_search_never_hits_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server);
        assert!(api.search_movies("").await.unwrap().is_empty());
        assert!(api.search_movies("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_sends_trimmed_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/search"))
            .and(query_param("query", "dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "title": "Dune" }])))
            .expect(1)
            .mount(&server)
            .await;

        let movies = client(&server).search_movies(" dune ").await.unwrap();
        assert_eq!(movies[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_movie_id_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies/a%2F..%2Fadmin"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "title": "leak" })))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&format!("{}/api/", server.uri()), Duration::from_secs(2)).unwrap();
        assert!(matches!(api.get_movie("a/../admin").await, Err(BackendError::NotFound(_))));
        assert!(matches!(api.get_movie("..").await, Err(BackendError::NotFound(_))));
        assert!(matches!(api.delete_movie("t", "").await, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_movie_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).get_movie("99").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        match client(&server).list_movies().await.unwrap_err() {
            BackendError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_token_resolves_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/firebase"))
            .and(header("authorization", "Bearer id-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "authorities": [{ "authority": "ROLE_STAFF" }] }
            })))
            .mount(&server)
            .await;

        let role = client(&server).exchange_token("id-123").await.unwrap();
        assert_eq!(role, Some(Role::Staff));
    }

    #[tokio::test]
    async fn test_create_cinema_sends_bearer_and_body() {
        let server = MockServer::start().await;
        let draft = CinemaDraft {
            name: "Centro".into(),
            address: "Av. Principal 1".into(),
            city: "Lima".into(),
            rooms: 6,
        };
        Mock::given(method("POST"))
            .and(path("/admin/cinemas"))
            .and(header("authorization", "Bearer admin-token"))
            .and(body_json(json!({ "name": "Centro", "address": "Av. Principal 1", "city": "Lima", "rooms": 6 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 10, "name": "Centro", "address": "Av. Principal 1", "city": "Lima", "roomCount": 6
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cinema = client(&server).create_cinema("admin-token", &draft).await.unwrap();
        assert_eq!(cinema.id, "10");
        assert_eq!(cinema.rooms, 6);
    }

    #[tokio::test]
    async fn test_backend_login_maps_session_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({ "email": "ana@cine.pe", "password": "secreto1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-abc",
                "refreshToken": "ref-abc",
                "user": { "id": 7, "email": "ana@cine.pe", "name": "Ana", "role": "ADMIN" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = client(&server);
        let session = api.sign_in_with_password("ana@cine.pe", "secreto1").await.unwrap();
        assert_eq!(session.uid, "7");
        assert_eq!(session.display_name.as_deref(), Some("Ana"));
        assert_eq!(session.role_hint, Some(Role::Admin));
        assert_eq!(session.id_token.as_str(), "jwt-abc");

        let err = api.sign_in_with_password("ana@cine.pe", "wrong").await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_CREDENTIAL);
    }
}
