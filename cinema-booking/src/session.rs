use chrono::{DateTime, Duration, Utc};
use cinema_shared::Movie;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seat_map::{SeatId, SeatMap};

/// The screening picked on the movie detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowtimeSelection {
    pub date: String,
    pub time: String,
}

impl ShowtimeSelection {
    pub fn label(&self) -> String {
        format!("{} {}", self.date, self.time)
    }
}

/// How long a `processing` payment may hold the booking before it is treated as abandoned.
pub const PROCESSING_TIMEOUT_SECS: i64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Idle,
    Processing {
        #[serde(default)]
        started_at: DateTime<Utc>,
    },
    Complete {
        reference: String,
        completed_at: DateTime<Utc>,
    },
}

impl PaymentState {
    pub fn processing() -> Self {
        PaymentState::Processing { started_at: Utc::now() }
    }

    /// A processing attempt older than the timeout never finished writing its outcome.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self {
            PaymentState::Processing { started_at } => {
                now - *started_at >= Duration::seconds(PROCESSING_TIMEOUT_SECS)
            }
            _ => false,
        }
    }

    /// Name of the state that locks the booking, if any.
    pub fn lock(&self, now: DateTime<Utc>) -> Option<&'static str> {
        match self {
            PaymentState::Idle => None,
            PaymentState::Processing { .. } if self.is_stale(now) => None,
            PaymentState::Processing { .. } => Some("processing"),
            PaymentState::Complete { .. } => Some("complete"),
        }
    }
}

/// In-progress ticket purchase, stored under the session's `booking` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSession {
    pub id: Uuid,
    pub movie: Option<Movie>,
    pub showtime: Option<ShowtimeSelection>,
    pub seat_map: Option<SeatMap>,
    /// Seats confirmed with "continue"; empty until then.
    #[serde(default)]
    pub selected_seats: Vec<SeatId>,
    #[serde(default)]
    pub payment: PaymentState,
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            movie: None,
            showtime: None,
            seat_map: None,
            selected_seats: Vec::new(),
            payment: PaymentState::Idle,
        }
    }

    pub fn ticket_count(&self) -> u8 {
        self.seat_map.as_ref().map_or(1, SeatMap::ticket_count)
    }

    pub fn has_showtime(&self) -> bool {
        self.movie.is_some() && self.showtime.is_some()
    }

    pub fn has_committed_seats(&self) -> bool {
        !self.selected_seats.is_empty()
    }

    pub fn seat_labels(&self) -> Vec<String> {
        self.selected_seats.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_state_wire_shape() {
        let idle = serde_json::to_value(PaymentState::Idle).unwrap();
        assert_eq!(idle, serde_json::json!({ "status": "idle" }));

        let session = BookingSession::new();
        let raw = serde_json::to_string(&session).unwrap();
        let restored: BookingSession = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.ticket_count(), 1);
        assert!(!restored.has_showtime());
    }

    #[test]
    fn test_abandoned_processing_releases_lock() {
        let now = Utc::now();
        let fresh = PaymentState::Processing { started_at: now - Duration::seconds(5) };
        assert_eq!(fresh.lock(now), Some("processing"));

        let abandoned = PaymentState::Processing { started_at: now - Duration::seconds(PROCESSING_TIMEOUT_SECS) };
        assert!(abandoned.is_stale(now));
        assert_eq!(abandoned.lock(now), None);

        // Entries written without a start time are treated as abandoned.
        let legacy: PaymentState = serde_json::from_value(serde_json::json!({ "status": "processing" })).unwrap();
        assert_eq!(legacy.lock(now), None);
    }
}
