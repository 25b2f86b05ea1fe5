use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use cinema_core::search::MovieSearchQuery;
use cinema_shared::{Movie, Theme, UserRecord};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;
use crate::theme::current_theme;

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub movies: Vec<Movie>,
    pub query: Option<String>,
    pub theme: Theme,
    pub user: Option<UserRecord>,
}

#[derive(Debug, Serialize)]
pub struct MovieView {
    pub movie: Movie,
    pub theme: Theme,
    pub user: Option<UserRecord>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/movie/{id}", get(movie_detail))
}

/// Movie listing; `?q=` switches to search once it passes the query guard.
async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MovieSearchQuery>,
) -> Result<Json<HomeView>, AppError> {
    let movies = match query.searchable() {
        Some(q) => state.catalog.search_movies(q).await?,
        None => state.catalog.list_movies().await?,
    };

    Ok(Json(HomeView {
        movies,
        query: query.searchable().map(str::to_string),
        theme: current_theme(&state, &session.id).await?,
        user: state.auth.current_user(&session.id).await?,
    }))
}

async fn movie_detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<MovieView>, AppError> {
    let movie = state.catalog.get_movie(&id).await?;
    Ok(Json(MovieView {
        movie,
        theme: current_theme(&state, &session.id).await?,
        user: state.auth.current_user(&session.id).await?,
    }))
}
