use anyhow::Context;
use async_trait::async_trait;

use crate::models::Booking;

/// Downstream collaborators notified after a booking confirms: the
/// accounting ledger (revenue fact) and invoice generation. Fire-and-forget
/// from the caller's point of view; failures here never roll back a booking.
#[async_trait]
pub trait BookingEventSink: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> anyhow::Result<()>;
}

pub struct WebhookEventSink {
    ledger_url: String,
    invoice_url: String,
    client: reqwest::Client,
}

impl WebhookEventSink {
    pub fn new(ledger_url: String, invoice_url: String) -> Self {
        Self {
            ledger_url,
            invoice_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BookingEventSink for WebhookEventSink {
    async fn booking_confirmed(&self, booking: &Booking) -> anyhow::Result<()> {
        if !self.ledger_url.is_empty() {
            let fact = serde_json::json!({
                "booking_id": booking.id,
                "reference": booking.reference,
                "resource_id": booking.resource_id,
                "amount": booking.amount.total,
                "online_amount": booking.amount.online_amount,
                "venue_amount": booking.amount.venue_amount,
                "payment_reference": booking.payment_reference,
            });
            self.client
                .post(&self.ledger_url)
                .json(&fact)
                .send()
                .await
                .context("failed to post booking revenue fact")?
                .error_for_status()
                .context("ledger webhook returned error")?;
        }

        if !self.invoice_url.is_empty() {
            let notice = serde_json::json!({
                "booking_id": booking.id,
                "reference": booking.reference,
                "user_id": booking.user_id,
                "amount": booking.amount.total,
            });
            self.client
                .post(&self.invoice_url)
                .json(&notice)
                .send()
                .await
                .context("failed to notify invoice generation")?
                .error_for_status()
                .context("invoice webhook returned error")?;
        }

        Ok(())
    }
}

/// Used when no webhook endpoints are configured (tests, local dev).
pub struct NoopEventSink;

#[async_trait]
impl BookingEventSink for NoopEventSink {
    async fn booking_confirmed(&self, _booking: &Booking) -> anyhow::Result<()> {
        Ok(())
    }
}
