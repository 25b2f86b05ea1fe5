use chrono::Utc;
use cinema_core::storage::{keys, SessionStorage};
use cinema_core::StorageError;
use cinema_shared::Movie;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::seat_map::{SeatError, SeatId, SeatMap, SeatState, MAX_TICKETS};
use crate::session::{BookingSession, PaymentState, ShowtimeSelection};

/// Pages of the booking flow that have preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Seats,
    /// `explicit_redirect` is set when the login page was opened with a `redirect` target.
    Login { explicit_redirect: bool },
    Payment,
}

pub const PAYMENT_LOGIN_REDIRECT: &str = "/login?redirect=/payment";

/// Where to send the user when a step's preconditions are not met.
pub fn gate(step: Step, session: &BookingSession, logged_in: bool) -> Result<(), String> {
    match step {
        Step::Seats if !session.has_showtime() => Err("/".into()),
        Step::Login { explicit_redirect: false } if !session.has_committed_seats() => Err("/".into()),
        Step::Payment if !session.has_committed_seats() => Err("/".into()),
        Step::Payment if !logged_in => Err(PAYMENT_LOGIN_REDIRECT.into()),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketAction {
    Increment,
    Decrement,
}

/// Body of a ticket count change: either a stepper action or an absolute count.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketChange {
    #[serde(default)]
    pub action: Option<TicketAction>,
    #[serde(default)]
    pub count: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Redirect to {0}")]
    Detour(String),

    #[error("Showtime {date} {time} is not scheduled for this movie")]
    UnknownShowtime { date: String, time: String },

    #[error("Select {required} seats to continue ({selected} selected)")]
    SeatsIncomplete { selected: usize, required: u8 },

    #[error("Booking is locked while payment is {0}")]
    PaymentInProgress(&'static str),

    #[error("Ticket change needs an action or a count")]
    EmptyTicketChange,

    #[error(transparent)]
    Seat(#[from] SeatError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Booking flow controller. Every mutation is written back to session storage.
#[derive(Clone)]
pub struct BookingFlow {
    storage: Arc<dyn SessionStorage>,
    max_tickets: u8,
}

impl BookingFlow {
    pub fn new(storage: Arc<dyn SessionStorage>, max_tickets: u8) -> Self {
        Self {
            storage,
            max_tickets: max_tickets.clamp(1, MAX_TICKETS),
        }
    }

    pub async fn load(&self, sid: &str) -> Result<BookingSession, FlowError> {
        let Some(raw) = self.storage.get(sid, keys::BOOKING).await? else {
            return Ok(BookingSession::new());
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("Discarding unreadable booking for session {}: {}", sid, e);
                self.storage.remove(sid, &[keys::BOOKING]).await?;
                Ok(BookingSession::new())
            }
        }
    }

    pub async fn save(&self, sid: &str, session: &BookingSession) -> Result<(), FlowError> {
        let raw = serde_json::to_string(session).map_err(StorageError::from)?;
        self.storage.set(sid, keys::BOOKING, &raw).await?;
        Ok(())
    }

    pub async fn clear(&self, sid: &str) -> Result<(), FlowError> {
        self.storage.remove(sid, &[keys::BOOKING]).await?;
        Ok(())
    }

    /// Loads the booking and checks the step's preconditions.
    pub async fn enter(&self, sid: &str, step: Step, logged_in: bool) -> Result<BookingSession, FlowError> {
        let session = self.load(sid).await?;
        gate(step, &session, logged_in).map_err(|location| {
            debug!("Gate {:?} redirects session {} to {}", step, sid, location);
            FlowError::Detour(location)
        })?;
        Ok(session)
    }

    /// Starts a new selection: seats and payment from any earlier choice are dropped.
    pub async fn select_movie_showtime(
        &self,
        sid: &str,
        movie: Movie,
        date: &str,
        time: &str,
    ) -> Result<BookingSession, FlowError> {
        if !movie.has_showtime(date, time) {
            return Err(FlowError::UnknownShowtime {
                date: date.to_string(),
                time: time.to_string(),
            });
        }
        let previous = self.load(sid).await?;
        if matches!(previous.payment, PaymentState::Processing { .. }) && !previous.payment.is_stale(Utc::now()) {
            return Err(FlowError::PaymentInProgress("processing"));
        }

        let mut session = BookingSession::new();
        session.movie = Some(movie);
        session.showtime = Some(ShowtimeSelection {
            date: date.to_string(),
            time: time.to_string(),
        });
        self.save(sid, &session).await?;
        Ok(session)
    }

    /// Seat page mount: fresh occupancy and an empty selection.
    pub async fn mount_seats(&self, sid: &str) -> Result<BookingSession, FlowError> {
        let mut session = self.enter(sid, Step::Seats, false).await?;
        ensure_editable(sid, &mut session)?;
        match session.seat_map.as_mut() {
            Some(map) => map.remount(&mut rand::thread_rng()),
            None => session.seat_map = Some(SeatMap::generate(&mut rand::thread_rng(), self.max_tickets)),
        }
        session.selected_seats.clear();
        self.save(sid, &session).await?;
        Ok(session)
    }

    pub async fn change_tickets(&self, sid: &str, change: &TicketChange) -> Result<BookingSession, FlowError> {
        self.with_seat_map(sid, |map| {
            match (change.count, change.action) {
                (Some(count), _) => map.set_ticket_count(count)?,
                (None, Some(TicketAction::Increment)) => {
                    map.increment();
                }
                (None, Some(TicketAction::Decrement)) => {
                    map.decrement();
                }
                (None, None) => return Err(FlowError::EmptyTicketChange),
            }
            Ok(())
        })
        .await
    }

    pub async fn toggle_seat(&self, sid: &str, seat: SeatId) -> Result<(BookingSession, SeatState), FlowError> {
        let mut state = SeatState::Available;
        let session = self
            .with_seat_map(sid, |map| {
                state = map.toggle(seat)?;
                Ok(())
            })
            .await?;
        Ok((session, state))
    }

    /// Confirms the selection once it matches the ticket count.
    pub async fn commit_seats(&self, sid: &str) -> Result<BookingSession, FlowError> {
        let mut session = self.enter(sid, Step::Seats, false).await?;
        ensure_editable(sid, &mut session)?;
        let map = session.seat_map.as_ref().ok_or(FlowError::Detour("/seats".into()))?;
        if !map.can_continue() {
            return Err(FlowError::SeatsIncomplete {
                selected: map.selected().len(),
                required: map.ticket_count(),
            });
        }
        session.selected_seats = map.selected().to_vec();
        self.save(sid, &session).await?;
        Ok(session)
    }

    async fn with_seat_map<F>(&self, sid: &str, mutate: F) -> Result<BookingSession, FlowError>
    where
        F: FnOnce(&mut SeatMap) -> Result<(), FlowError>,
    {
        let mut session = self.enter(sid, Step::Seats, false).await?;
        ensure_editable(sid, &mut session)?;
        let map = session.seat_map.as_mut().ok_or(FlowError::Detour("/seats".into()))?;
        mutate(map)?;
        // Editing the map invalidates an earlier commit.
        session.selected_seats.clear();
        self.save(sid, &session).await?;
        Ok(session)
    }
}

/// Seats can only change while nothing is being or has been charged for them.
fn ensure_editable(sid: &str, session: &mut BookingSession) -> Result<(), FlowError> {
    let now = Utc::now();
    if let Some(state) = session.payment.lock(now) {
        return Err(FlowError::PaymentInProgress(state));
    }
    if session.payment.is_stale(now) {
        warn!("Releasing abandoned payment for session {}", sid);
        session.payment = PaymentState::Idle;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct TestStorage {
        values: RwLock<HashMap<(String, String), String>>,
    }

    #[async_trait]
    impl SessionStorage for TestStorage {
        async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.values.read().await.get(&(sid.into(), key.into())).cloned())
        }

        async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), StorageError> {
            self.values.write().await.insert((sid.into(), key.into()), value.into());
            Ok(())
        }

        async fn remove(&self, sid: &str, keys: &[&str]) -> Result<(), StorageError> {
            let mut values = self.values.write().await;
            for key in keys {
                values.remove(&(sid.to_string(), key.to_string()));
            }
            Ok(())
        }
    }

    fn movie() -> Movie {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Dune",
            "showtimes": [{ "date": "2024-12-25", "times": ["18:00", { "time": "21:00", "room": "Sala 2" }] }]
        }))
        .unwrap()
    }

    fn flow() -> BookingFlow {
        BookingFlow::new(Arc::new(TestStorage::default()), MAX_TICKETS)
    }

    #[test]
    fn test_gates() {
        let mut session = BookingSession::new();
        assert_eq!(gate(Step::Seats, &session, true), Err("/".to_string()));
        assert_eq!(gate(Step::Login { explicit_redirect: false }, &session, false), Err("/".to_string()));
        assert_eq!(gate(Step::Login { explicit_redirect: true }, &session, false), Ok(()));
        assert_eq!(gate(Step::Payment, &session, true), Err("/".to_string()));

        session.movie = Some(movie());
        session.showtime = Some(ShowtimeSelection { date: "2024-12-25".into(), time: "18:00".into() });
        assert_eq!(gate(Step::Seats, &session, false), Ok(()));

        session.selected_seats = vec!["A1".parse().unwrap()];
        assert_eq!(gate(Step::Payment, &session, false), Err(PAYMENT_LOGIN_REDIRECT.to_string()));
        assert_eq!(gate(Step::Payment, &session, true), Ok(()));
    }

    #[tokio::test]
    async fn test_unknown_showtime_rejected() {
        let flow = flow();
        let err = flow.select_movie_showtime("s1", movie(), "2024-12-25", "09:00").await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownShowtime { .. }));

        let session = flow.select_movie_showtime("s1", movie(), "2024-12-25", "21:00").await.unwrap();
        assert_eq!(session.showtime.unwrap().label(), "2024-12-25 21:00");
    }

    #[tokio::test]
    async fn test_seat_flow_persists_between_calls() {
        let flow = flow();
        assert!(matches!(flow.mount_seats("s1").await, Err(FlowError::Detour(_))));

        flow.select_movie_showtime("s1", movie(), "2024-12-25", "18:00").await.unwrap();
        let mounted = flow.mount_seats("s1").await.unwrap();
        let free: Vec<SeatId> = mounted
            .seat_map
            .as_ref()
            .unwrap()
            .grid()
            .into_iter()
            .flat_map(|row| row.seats)
            .filter(|seat| seat.state == SeatState::Available)
            .map(|seat| seat.id)
            .take(2)
            .collect();

        flow.change_tickets("s1", &TicketChange { action: Some(TicketAction::Increment), count: None })
            .await
            .unwrap();
        flow.toggle_seat("s1", free[0]).await.unwrap();
        assert!(matches!(flow.commit_seats("s1").await, Err(FlowError::SeatsIncomplete { selected: 1, required: 2 })));

        flow.toggle_seat("s1", free[1]).await.unwrap();
        let committed = flow.commit_seats("s1").await.unwrap();
        assert_eq!(committed.selected_seats, free);

        let reloaded = flow.load("s1").await.unwrap();
        assert!(reloaded.has_committed_seats());
        assert_eq!(reloaded.ticket_count(), 2);
    }

    #[tokio::test]
    async fn test_new_showtime_resets_seats() {
        let flow = flow();
        flow.select_movie_showtime("s1", movie(), "2024-12-25", "18:00").await.unwrap();
        flow.mount_seats("s1").await.unwrap();

        let session = flow.select_movie_showtime("s1", movie(), "2024-12-25", "21:00").await.unwrap();
        assert!(session.seat_map.is_none());
        assert!(session.selected_seats.is_empty());
        assert_eq!(session.payment, PaymentState::Idle);
    }

    #[tokio::test]
    async fn test_paid_seats_cannot_be_edited() {
        let flow = flow();
        flow.select_movie_showtime("s1", movie(), "2024-12-25", "18:00").await.unwrap();
        flow.mount_seats("s1").await.unwrap();

        let mut session = flow.load("s1").await.unwrap();
        let free = session
            .seat_map
            .as_ref()
            .unwrap()
            .grid()
            .into_iter()
            .flat_map(|row| row.seats)
            .find(|seat| seat.state == SeatState::Available)
            .map(|seat| seat.id)
            .unwrap();
        session.selected_seats = vec![free];
        session.payment = PaymentState::Complete {
            reference: "CIN-PAID0001".into(),
            completed_at: Utc::now(),
        };
        flow.save("s1", &session).await.unwrap();

        assert!(matches!(flow.mount_seats("s1").await, Err(FlowError::PaymentInProgress("complete"))));
        assert!(matches!(flow.toggle_seat("s1", free).await, Err(FlowError::PaymentInProgress("complete"))));
        assert!(matches!(flow.commit_seats("s1").await, Err(FlowError::PaymentInProgress("complete"))));

        session.payment = PaymentState::processing();
        flow.save("s1", &session).await.unwrap();
        assert!(matches!(flow.mount_seats("s1").await, Err(FlowError::PaymentInProgress("processing"))));

        let stored = flow.load("s1").await.unwrap();
        assert_eq!(stored.selected_seats, vec![free]);
    }

    #[tokio::test]
    async fn test_abandoned_payment_unlocks_booking() {
        let flow = flow();
        let mut session = flow.select_movie_showtime("s1", movie(), "2024-12-25", "18:00").await.unwrap();
        session.payment = PaymentState::Processing {
            started_at: Utc::now() - chrono::Duration::seconds(crate::session::PROCESSING_TIMEOUT_SECS + 1),
        };
        flow.save("s1", &session).await.unwrap();

        let mounted = flow.mount_seats("s1").await.unwrap();
        assert_eq!(mounted.payment, PaymentState::Idle);

        session.payment = PaymentState::processing();
        flow.save("s1", &session).await.unwrap();
        let err = flow.select_movie_showtime("s1", movie(), "2024-12-25", "21:00").await.unwrap_err();
        assert!(matches!(err, FlowError::PaymentInProgress("processing")));
    }
}
