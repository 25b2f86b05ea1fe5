use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "cinema_session";

// ============================================================================
// Session Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sid: String,
    pub exp: usize,
}

/// The caller's session, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_seconds: u64,
}

impl SessionConfig {
    pub fn issue(&self, sid: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sid: sid.to_string(),
            exp: (Utc::now() + Duration::seconds(self.ttl_seconds as i64)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
    }

    pub fn verify(&self, token: &str) -> Option<String> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims.sid)
    }
}

// ============================================================================
// Session Middleware
// ============================================================================

/// Resolves the session from the signed cookie, minting a new one when it is
/// missing, tampered with or expired. The cookie is re-issued on every response.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let sid = match jar.get(SESSION_COOKIE).and_then(|c| state.session.verify(c.value())) {
        Some(sid) => sid,
        None => {
            let sid = Uuid::new_v4().simple().to_string();
            tracing::debug!("Minted session {}", sid);
            sid
        }
    };

    req.extensions_mut().insert(Session { id: sid.clone() });
    let response = next.run(req).await;

    match state.session.issue(&sid) {
        Ok(token) => {
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), response).into_response()
        }
        Err(e) => {
            tracing::error!("Session token encoding failed: {}", e);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_round_trip() {
        let config = SessionConfig {
            secret: "test-secret".into(),
            ttl_seconds: 60,
        };
        let token = config.issue("abc").unwrap();
        assert_eq!(config.verify(&token).as_deref(), Some("abc"));

        let other = SessionConfig {
            secret: "other-secret".into(),
            ttl_seconds: 60,
        };
        assert_eq!(other.verify(&token), None);
        assert_eq!(config.verify("garbage"), None);
    }
}
