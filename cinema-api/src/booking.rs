use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use cinema_booking::flow::PAYMENT_LOGIN_REDIRECT;
use cinema_booking::seat_map::SeatRowView;
use cinema_booking::{BookingSession, SeatId, SeatState, ShowtimeSelection, TicketChange};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ShowtimeRequest {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub seat: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatsView {
    pub movie_id: String,
    pub movie_title: String,
    pub showtime: Option<ShowtimeSelection>,
    pub ticket_count: u8,
    pub max_tickets: u8,
    pub rows: Vec<SeatRowView>,
    pub selected: Vec<SeatId>,
    pub can_continue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggled: Option<SeatState>,
}

impl SeatsView {
    fn from_session(session: &BookingSession, toggled: Option<SeatState>) -> Result<Self, AppError> {
        let map = session
            .seat_map
            .as_ref()
            .ok_or_else(|| AppError::Redirect("/seats".into()))?;
        let movie = session.movie.as_ref().ok_or_else(|| AppError::Redirect("/".into()))?;

        Ok(Self {
            movie_id: movie.id.clone(),
            movie_title: movie.title.clone(),
            showtime: session.showtime.clone(),
            ticket_count: map.ticket_count(),
            max_tickets: map.max_tickets(),
            rows: map.grid(),
            selected: map.selected().to_vec(),
            can_continue: map.can_continue(),
            toggled,
        })
    }
}

/// Showtime selection hits the catalog; it sits behind the circuit breaker.
pub fn showtime_routes() -> Router<AppState> {
    Router::new().route("/movie/{id}/showtime", post(select_showtime))
}

pub fn seat_routes() -> Router<AppState> {
    Router::new()
        .route("/seats", get(seats))
        .route("/seats/tickets", post(change_tickets))
        .route("/seats/toggle", post(toggle_seat))
        .route("/seats/continue", post(continue_to_payment))
}

// ============================================================================
// Handlers
// ============================================================================

async fn select_showtime(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(payload): Json<ShowtimeRequest>,
) -> Result<Redirect, AppError> {
    let movie = state.catalog.get_movie(&id).await?;
    state
        .booking
        .select_movie_showtime(&session.id, movie, &payload.date, &payload.time)
        .await?;
    Ok(Redirect::to("/seats"))
}

/// Every visit regenerates occupancy and clears the selection.
async fn seats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<SeatsView>, AppError> {
    let booking = state.booking.mount_seats(&session.id).await?;
    Ok(Json(SeatsView::from_session(&booking, None)?))
}

async fn change_tickets(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(change): Json<TicketChange>,
) -> Result<Json<SeatsView>, AppError> {
    let booking = state.booking.change_tickets(&session.id, &change).await?;
    Ok(Json(SeatsView::from_session(&booking, None)?))
}

async fn toggle_seat(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<SeatsView>, AppError> {
    let seat: SeatId = payload.seat.parse()?;
    let (booking, seat_state) = state.booking.toggle_seat(&session.id, seat).await?;
    Ok(Json(SeatsView::from_session(&booking, Some(seat_state))?))
}

async fn continue_to_payment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Redirect, AppError> {
    state.booking.commit_seats(&session.id).await?;
    if state.auth.is_logged_in(&session.id).await? {
        Ok(Redirect::to("/payment"))
    } else {
        Ok(Redirect::to(PAYMENT_LOGIN_REDIRECT))
    }
}
