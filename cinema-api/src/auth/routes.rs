use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Extension, Json, Router,
};
use cinema_booking::Step;
use cinema_core::identity::OAuthProvider;
use cinema_shared::{Role, UserRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::guard::require_role;
use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
    pub credential: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub redirect: Option<String>,
    pub user: Option<UserRecord>,
    pub providers: [OAuthProvider; 2],
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/login/oauth", post(login_oauth))
        .route("/register", post(register))
        .route("/password-reset", post(password_reset))
        .route("/auth/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
}

/// Only same-site paths are honoured as redirect targets.
fn safe_redirect(target: Option<&str>) -> Option<&str> {
    // Browsers read `\` as `/`, so `/\host` is protocol-relative too.
    target.filter(|t| {
        t.starts_with('/')
            && !t.starts_with("//")
            && !t.contains('\\')
            && !t.chars().any(char::is_control)
    })
}

/// Where a fresh sign-in lands: an explicit target, the payment step when seats
/// are already committed, otherwise the role's landing page.
async fn post_login_destination(
    state: &AppState,
    sid: &str,
    redirect: Option<&str>,
    role: Role,
) -> Result<String, AppError> {
    if let Some(target) = safe_redirect(redirect) {
        return Ok(target.to_string());
    }
    if state.booking.load(sid).await?.has_committed_seats() {
        return Ok("/payment".to_string());
    }
    Ok(role.landing_path().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

async fn login_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RedirectQuery>,
) -> Result<Json<LoginView>, AppError> {
    let redirect = safe_redirect(query.redirect.as_deref()).map(str::to_string);
    let user = state.auth.current_user(&session.id).await?;
    state
        .booking
        .enter(
            &session.id,
            Step::Login {
                explicit_redirect: redirect.is_some(),
            },
            user.is_some(),
        )
        .await?;

    Ok(Json(LoginView {
        redirect,
        user,
        providers: [OAuthProvider::Google, OAuthProvider::Facebook],
    }))
}

async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RedirectQuery>,
    Json(payload): Json<LoginRequest>,
) -> Result<Redirect, AppError> {
    let user = state.auth.sign_in(&session.id, &payload.email, &payload.password).await?;
    let redirect = payload.redirect.as_deref().or(query.redirect.as_deref());
    let destination = post_login_destination(&state, &session.id, redirect, user.role).await?;
    Ok(Redirect::to(&destination))
}

async fn login_oauth(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RedirectQuery>,
    Json(payload): Json<OAuthRequest>,
) -> Result<Redirect, AppError> {
    let user = state
        .auth
        .sign_in_with_oauth(&session.id, payload.provider, &payload.credential)
        .await?;
    let redirect = payload.redirect.as_deref().or(query.redirect.as_deref());
    let destination = post_login_destination(&state, &session.id, redirect, user.role).await?;
    Ok(Redirect::to(&destination))
}

async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RedirectQuery>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Redirect, AppError> {
    let user = state
        .auth
        .register(
            &session.id,
            &payload.email,
            &payload.password,
            payload.display_name.as_deref(),
        )
        .await?;
    let redirect = payload.redirect.as_deref().or(query.redirect.as_deref());
    let destination = post_login_destination(&state, &session.id, redirect, user.role).await?;
    Ok(Redirect::to(&destination))
}

async fn password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.send_password_reset(&payload.email).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "sent": true }))))
}

async fn refresh(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<StatusCode, AppError> {
    state.auth.refresh(&session.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Redirect, AppError> {
    state.auth.sign_out(&session.id).await?;
    Ok(Redirect::to("/"))
}

const ANY_ROLE: [Role; 3] = [Role::Customer, Role::Staff, Role::Admin];

async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserRecord>, AppError> {
    let user = state.auth.current_user(&session.id).await?;
    let user = require_role(user.as_ref(), &ANY_ROLE, "/profile")?;
    Ok(Json(user.clone()))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserRecord>, AppError> {
    let display_name = payload.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::ValidationError("Display name is required".into()));
    }
    let user = state.auth.current_user(&session.id).await?;
    require_role(user.as_ref(), &ANY_ROLE, "/profile")?;

    let user = state.auth.update_profile(&session.id, display_name).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect_rejects_foreign_targets() {
        assert_eq!(safe_redirect(Some("/payment")), Some("/payment"));
        assert_eq!(safe_redirect(Some("//evil.example")), None);
        assert_eq!(safe_redirect(Some("https://evil.example")), None);
        assert_eq!(safe_redirect(Some("/\\evil.example")), None);
        assert_eq!(safe_redirect(Some("/seats\\..\\admin")), None);
        assert_eq!(safe_redirect(Some("/\t/evil.example")), None);
        assert_eq!(safe_redirect(Some("/pay\nment")), None);
        assert_eq!(safe_redirect(Some("/movie/7?tab=times")), Some("/movie/7?tab=times"));
        assert_eq!(safe_redirect(None), None);
    }
}
