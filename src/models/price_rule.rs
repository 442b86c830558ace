use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Admin-defined price override for slots inside a time window on matching
/// days. Soft-deleted via `enabled = false`, never physically removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRule {
    pub id: i64,
    pub resource_id: String,
    pub day_type: DayType,
    pub specific_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub base_price: Option<Decimal>,
    pub extra_charge: Option<Decimal>,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
    Date,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
            DayType::Date => "date",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "weekend" => DayType::Weekend,
            "date" => DayType::Date,
            _ => DayType::Weekday,
        }
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl PriceRule {
    /// Whether this rule is in effect on the given calendar date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self.day_type {
            DayType::Weekday => !is_weekend(date),
            DayType::Weekend => is_weekend(date),
            DayType::Date => self.specific_date == Some(date),
        }
    }

    /// Whether the rule window fully contains `[start, end)`. Rules never
    /// apply to slots they only partially overlap.
    pub fn covers(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time <= start && end <= self.end_time
    }

    pub fn window_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}
