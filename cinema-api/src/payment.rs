use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use cinema_booking::{BookingSession, PaymentState, ShowtimeSelection, Step};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::Session;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub booking_id: String,
    pub movie_title: Option<String>,
    pub showtime: Option<ShowtimeSelection>,
    pub seats: Vec<String>,
    pub ticket_count: u8,
    pub payment: PaymentState,
}

impl From<&BookingSession> for PaymentView {
    fn from(session: &BookingSession) -> Self {
        Self {
            booking_id: session.id.to_string(),
            movie_title: session.movie.as_ref().map(|m| m.title.clone()),
            showtime: session.showtime.clone(),
            seats: session.seat_labels(),
            ticket_count: session.ticket_count(),
            payment: session.payment.clone(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/payment", get(summary).post(pay))
}

async fn summary(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<PaymentView>, AppError> {
    let logged_in = state.auth.is_logged_in(&session.id).await?;
    let booking = state.booking.enter(&session.id, Step::Payment, logged_in).await?;
    Ok(Json(PaymentView::from(&booking)))
}

async fn pay(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<PaymentView>, AppError> {
    let logged_in = state.auth.is_logged_in(&session.id).await?;
    let booking = state.payments.pay(&state.booking, &session.id, logged_in).await?;
    Ok(Json(PaymentView::from(&booking)))
}
