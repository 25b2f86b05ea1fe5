use axum::{
    http::Method,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod booking;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod payment;
pub mod staff;
pub mod state;
pub mod theme;

pub use state::{AppState, Collaborators, Settings};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything that calls the cinema backend shares one breaker.
    let backend_routes = Router::new()
        .merge(pages::routes())
        .merge(booking::showtime_routes())
        .merge(admin::routes().route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::admin_only)))
        .merge(staff::routes().route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::staff_only)))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::circuit_breaker_middleware,
        ));

    Router::new()
        .merge(backend_routes)
        .merge(booking::seat_routes())
        .merge(payment::routes())
        .merge(auth::routes())
        .merge(theme::routes())
        .route("/health", get(health))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::session_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
