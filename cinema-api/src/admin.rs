use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use cinema_shared::{Cinema, CinemaDraft, Movie, MovieDraft, UserRecord};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub admin: UserRecord,
    pub movie_count: usize,
    pub cinema_count: usize,
}

/// Routes behind the ADMIN guard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(overview))
        .route("/admin/movies", get(list_movies).post(create_movie))
        .route("/admin/movies/{id}", put(update_movie).delete(delete_movie))
        .route("/admin/cinemas", get(list_cinemas).post(create_cinema))
}

async fn bearer(state: &AppState, session: &Session) -> Result<String, AppError> {
    state
        .auth
        .token(&session.id)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Missing session token".into()))
}

// ============================================================================
// Platform Overview
// ============================================================================

/// GET /admin
async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(admin): Extension<UserRecord>,
) -> Result<Json<AdminOverview>, AppError> {
    let token = bearer(&state, &session).await?;
    let movies = state.catalog.list_movies().await?;
    let cinemas = state.admin_catalog.list_cinemas(&token).await?;

    Ok(Json(AdminOverview {
        admin,
        movie_count: movies.len(),
        cinema_count: cinemas.len(),
    }))
}

// ============================================================================
// Movie Licensing
// ============================================================================

/// GET /admin/movies
async fn list_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.catalog.list_movies().await?))
}

/// POST /admin/movies
async fn create_movie(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(draft): Json<MovieDraft>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    draft.validate().map_err(AppError::InvalidFields)?;
    let token = bearer(&state, &session).await?;

    let movie = state.admin_catalog.create_movie(&token, &draft).await?;
    tracing::info!("Licensed movie {} ({})", movie.id, movie.title);
    Ok((StatusCode::CREATED, Json(movie)))
}

/// PUT /admin/movies/{id}
async fn update_movie(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(draft): Json<MovieDraft>,
) -> Result<Json<Movie>, AppError> {
    draft.validate().map_err(AppError::InvalidFields)?;
    let token = bearer(&state, &session).await?;
    Ok(Json(state.admin_catalog.update_movie(&token, &id, &draft).await?))
}

/// DELETE /admin/movies/{id}
async fn delete_movie(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let token = bearer(&state, &session).await?;
    state.admin_catalog.delete_movie(&token, &id).await?;
    tracing::info!("Removed movie {}", id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Cinemas
// ============================================================================

/// GET /admin/cinemas
async fn list_cinemas(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Cinema>>, AppError> {
    let token = bearer(&state, &session).await?;
    Ok(Json(state.admin_catalog.list_cinemas(&token).await?))
}

/// POST /admin/cinemas
async fn create_cinema(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(draft): Json<CinemaDraft>,
) -> Result<(StatusCode, Json<Cinema>), AppError> {
    draft.validate().map_err(AppError::InvalidFields)?;
    let token = bearer(&state, &session).await?;

    let cinema = state.admin_catalog.create_cinema(&token, &draft).await?;
    tracing::info!("Created cinema {} in {}", cinema.name, cinema.city);
    Ok((StatusCode::CREATED, Json(cinema)))
}
