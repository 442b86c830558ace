pub mod admin;
pub mod availability;
pub mod bookings;
pub mod health;

use chrono::{NaiveDate, NaiveTime};

use crate::errors::AppError;

pub(crate) fn parse_date_param(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {s} (expected YYYY-MM-DD)")))
}

pub(crate) fn parse_time_param(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| AppError::Validation(format!("invalid time: {s} (expected HH:MM)")))
}

pub(crate) fn parse_decimal_param(field: &str, s: &str) -> Result<rust_decimal::Decimal, AppError> {
    s.parse()
        .map_err(|_| AppError::Validation(format!("invalid decimal for {field}: {s}")))
}
