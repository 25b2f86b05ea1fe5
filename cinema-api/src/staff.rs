use axum::{extract::State, routing::get, Extension, Json, Router};
use cinema_shared::{Movie, UserRecord};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub movie_id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub room: Option<String>,
    pub available_seats: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StaffView {
    pub staff: UserRecord,
    pub schedule: Vec<ScheduleEntry>,
}

/// Routes behind the STAFF guard.
pub fn routes() -> Router<AppState> {
    Router::new().route("/staff", get(schedule))
}

/// Every screening of every movie, ordered by date then time.
pub fn build_schedule(movies: &[Movie]) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = movies
        .iter()
        .flat_map(|movie| {
            movie.showtimes.iter().flat_map(move |day| {
                day.times.iter().map(move |slot| ScheduleEntry {
                    movie_id: movie.id.clone(),
                    title: movie.title.clone(),
                    date: day.date.clone(),
                    time: slot.time().to_string(),
                    room: slot.room().map(str::to_string),
                    available_seats: match slot {
                        cinema_shared::ShowtimeSlot::Detailed(record) => record.available_seats,
                        cinema_shared::ShowtimeSlot::Time(_) => None,
                    },
                })
            })
        })
        .collect();
    entries.sort_by(|a, b| (&a.date, &a.time, &a.title).cmp(&(&b.date, &b.time, &b.title)));
    entries
}

/// GET /staff
async fn schedule(
    State(state): State<AppState>,
    Extension(staff): Extension<UserRecord>,
) -> Result<Json<StaffView>, AppError> {
    let movies = state.catalog.list_movies().await?;
    Ok(Json(StaffView {
        staff,
        schedule: build_schedule(&movies),
    }))
}
