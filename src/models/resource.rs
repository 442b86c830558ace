use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bookable resource (turf, court, table...). Its slots are never stored:
/// they are derived from the embedded slot configuration on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub venue_id: Option<String>,
    pub enabled: bool,
    pub slot_config: SlotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub base_price: Decimal,
    pub weekend_multiplier: Option<Decimal>,
    pub enabled: bool,
}
