use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SlotIdentity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub reference: String,
    pub resource_id: String,
    pub service_id: Option<String>,
    pub user_id: String,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub amount: PriceBreakdown,
    pub applied_rule_id: Option<i64>,
    pub status: BookingStatus,
    pub client_request_id: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn slot_identity(&self) -> SlotIdentity {
        SlotIdentity {
            resource_id: self.resource_id.clone(),
            date: self.booking_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Split of the total between online advance and at-venue collection,
/// with the platform fee on top of the resolved slot price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
    pub online_amount: Decimal,
    pub venue_amount: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "expired" => BookingStatus::Expired,
            _ => BookingStatus::Pending,
        }
    }
}
