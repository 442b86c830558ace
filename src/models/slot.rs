use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;

/// Composite key of a bookable window. Slots have no database row; this
/// structurally-derived identity is what locks and bookings are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SlotIdentity {
    pub resource_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// One derived slot. Ephemeral: recomputed on every read, identical output
/// for identical inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub base_price: Decimal,
    pub display_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    Disabled,
    Held,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Disabled => "disabled",
            SlotStatus::Held => "held",
        }
    }
}

/// Live availability view of one slot, as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub identity: SlotIdentity,
    pub display_order: i32,
    pub price: Decimal,
    pub applied_rule_id: Option<i64>,
    pub status: SlotStatus,
    pub reason: Option<String>,
}
