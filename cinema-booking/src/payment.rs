use chrono::Utc;
use cinema_core::payment::{PaymentAdapter, PaymentReceipt, PaymentRequest, PaymentStatus};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::flow::{BookingFlow, FlowError, Step};
use crate::session::{BookingSession, PaymentState};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment is already being processed")]
    AlreadyProcessing,

    #[error("Booking already paid: {0}")]
    AlreadyComplete(String),

    #[error("Payment declined")]
    Declined,

    #[error("Payment gateway failure: {0}")]
    Gateway(String),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Runs the payment step of a booking against a `PaymentAdapter`.
pub struct PaymentProcessor {
    adapter: Arc<dyn PaymentAdapter>,
}

impl PaymentProcessor {
    pub fn new(adapter: Arc<dyn PaymentAdapter>) -> Self {
        Self { adapter }
    }

    /// idle -> processing -> complete. A failed attempt goes back to idle; there is no retry.
    pub async fn pay(&self, flow: &BookingFlow, sid: &str, logged_in: bool) -> Result<BookingSession, PaymentError> {
        let mut session = flow.enter(sid, Step::Payment, logged_in).await?;
        match &session.payment {
            PaymentState::Complete { reference, .. } => return Err(PaymentError::AlreadyComplete(reference.clone())),
            PaymentState::Processing { .. } if !session.payment.is_stale(Utc::now()) => {
                return Err(PaymentError::AlreadyProcessing)
            }
            PaymentState::Processing { started_at } => {
                warn!("Booking {} stuck in processing since {}, charging again", session.id, started_at);
            }
            PaymentState::Idle => {}
        }

        session.payment = PaymentState::processing();
        flow.save(sid, &session).await?;

        // Detached so the outcome is written even when the caller goes away mid-payment.
        let settlement = tokio::spawn(settle(self.adapter.clone(), flow.clone(), sid.to_string(), session));
        settlement
            .await
            .map_err(|e| PaymentError::Gateway(format!("payment task aborted: {}", e)))?
    }
}

async fn settle(
    adapter: Arc<dyn PaymentAdapter>,
    flow: BookingFlow,
    sid: String,
    mut session: BookingSession,
) -> Result<BookingSession, PaymentError> {
    let request = PaymentRequest {
        booking_id: session.id,
        movie_id: session.movie.as_ref().map(|m| m.id.clone()).unwrap_or_default(),
        showtime: session.showtime.as_ref().map(|s| s.label()).unwrap_or_default(),
        seats: session.seat_labels(),
    };

    match adapter.process_payment(&request).await {
        Ok(PaymentReceipt { reference, status: PaymentStatus::Succeeded, completed_at }) => {
            info!("Booking {} paid, reference {}", session.id, reference);
            session.payment = PaymentState::Complete { reference, completed_at };
            flow.save(&sid, &session).await?;
            Ok(session)
        }
        Ok(_) => {
            session.payment = PaymentState::Idle;
            flow.save(&sid, &session).await?;
            Err(PaymentError::Declined)
        }
        Err(e) => {
            error!("Payment for booking {} failed: {}", session.id, e);
            session.payment = PaymentState::Idle;
            flow.save(&sid, &session).await?;
            Err(PaymentError::Gateway(e.to_string()))
        }
    }
}
