use axum::{extract::State, routing::{get, post}, Extension, Json, Router};
use cinema_core::storage::keys;
use cinema_shared::Theme;
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ThemeView {
    pub theme: Theme,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/theme", get(get_theme))
        .route("/theme/toggle", post(toggle_theme))
}

/// The session's theme; unknown stored values fall back to the configured default.
pub async fn current_theme(state: &AppState, sid: &str) -> Result<Theme, AppError> {
    let stored = state.storage.get(sid, keys::THEME).await?;
    Ok(stored
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(state.default_theme))
}

async fn get_theme(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ThemeView>, AppError> {
    let theme = current_theme(&state, &session.id).await?;
    Ok(Json(ThemeView { theme }))
}

async fn toggle_theme(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ThemeView>, AppError> {
    let theme = current_theme(&state, &session.id).await?.toggled();
    state.storage.set(&session.id, keys::THEME, theme.as_str()).await?;
    Ok(Json(ThemeView { theme }))
}
