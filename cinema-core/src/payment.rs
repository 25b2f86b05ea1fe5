use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// What is being paid for. There is no amount: the stub never charges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub booking_id: Uuid,
    pub movie_id: String,
    pub showtime: String,
    pub seats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub status: PaymentStatus,
    pub completed_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Process a payment for a booking (direct checkout)
    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

/// Payment stand-in: waits a fixed delay, then succeeds.
pub struct SimulatedPaymentAdapter {
    delay: Duration,
}

impl SimulatedPaymentAdapter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PaymentAdapter for SimulatedPaymentAdapter {
    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            "Simulating payment for booking {} ({} seats)",
            request.booking_id,
            request.seats.len()
        );
        tokio::time::sleep(self.delay).await;

        let reference = format!("CIN-{}", &request.booking_id.simple().to_string()[..8]).to_uppercase();
        Ok(PaymentReceipt {
            reference,
            status: PaymentStatus::Succeeded,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_payment_waits_then_succeeds() {
        let adapter = SimulatedPaymentAdapter::new(Duration::from_millis(2000));
        let request = PaymentRequest {
            booking_id: Uuid::new_v4(),
            movie_id: "7".into(),
            showtime: "2024-12-25 18:00".into(),
            seats: vec!["A1".into(), "A2".into()],
        };

        let started = tokio::time::Instant::now();
        let receipt = adapter.process_payment(&request).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(receipt.status, PaymentStatus::Succeeded);
        assert!(receipt.reference.starts_with("CIN-"));
        assert_eq!(receipt.reference.len(), 12);
    }
}
