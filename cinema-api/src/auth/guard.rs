use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use cinema_shared::{Role, UserRecord};

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

pub fn login_redirect(destination: &str) -> String {
    format!("/login?redirect={}", destination)
}

/// Anonymous users go to login, users with the wrong role go to their own landing page.
pub fn require_role<'a>(
    user: Option<&'a UserRecord>,
    allowed: &[Role],
    destination: &str,
) -> Result<&'a UserRecord, AppError> {
    let user = user.ok_or_else(|| AppError::Redirect(login_redirect(destination)))?;
    if !allowed.contains(&user.role) {
        tracing::debug!("{} ({}) not allowed on {}", user.uid, user.role.as_str(), destination);
        return Err(AppError::Redirect(user.role.landing_path().to_string()));
    }
    Ok(user)
}

// ============================================================================
// Role Middleware
// ============================================================================

async fn enforce(state: AppState, session: Session, mut req: Request, next: Next, allowed: &[Role]) -> Result<Response, AppError> {
    let user = state.auth.current_user(&session.id).await?;
    let destination = req.uri().path().to_string();
    let user = require_role(user.as_ref(), allowed, &destination)?.clone();

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn admin_only(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(state, session, req, next, &[Role::Admin]).await
}

pub async fn staff_only(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(state, session, req, next, &[Role::Staff]).await
}
