use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Admin-imposed unavailability window. A generated slot intersecting an
/// enabled window is disabled whole; slots are never split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisabledSlot {
    pub id: i64,
    pub resource_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: Option<String>,
    pub enabled: bool,
}
