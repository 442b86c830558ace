use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::reservation::{self, ReserveRequest};
use crate::state::AppState;

use super::{parse_date_param, parse_time_param};

#[derive(Serialize)]
pub struct AmountResponse {
    subtotal: Decimal,
    platform_fee: Decimal,
    total: Decimal,
    online_amount: Decimal,
    venue_amount: Decimal,
}

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    reference: String,
    resource_id: String,
    service_id: Option<String>,
    user_id: String,
    booking_date: String,
    start_time: String,
    end_time: String,
    amount: AmountResponse,
    applied_rule_id: Option<i64>,
    status: String,
    client_request_id: Option<String>,
    payment_reference: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            reference: b.reference,
            resource_id: b.resource_id,
            service_id: b.service_id,
            user_id: b.user_id,
            booking_date: b.booking_date.format("%Y-%m-%d").to_string(),
            start_time: b.start_time.format("%H:%M").to_string(),
            end_time: b.end_time.format("%H:%M").to_string(),
            amount: AmountResponse {
                subtotal: b.amount.subtotal,
                platform_fee: b.amount.platform_fee,
                total: b.amount.total,
                online_amount: b.amount.online_amount,
                venue_amount: b.amount.venue_amount,
            },
            applied_rule_id: b.applied_rule_id,
            status: b.status.as_str().to_string(),
            client_request_id: b.client_request_id,
            payment_reference: b.payment_reference,
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn acting_user(headers: &HeaderMap) -> Result<String, AppError> {
    // identity is established upstream; the engine trusts this header
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| AppError::Validation("missing X-User-Id header".to_string()))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct ReservePayload {
    pub resource_id: String,
    pub service_id: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub client_request_id: Option<String>,
}

pub async fn reserve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ReservePayload>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = acting_user(&headers)?;
    let request = ReserveRequest {
        resource_id: payload.resource_id,
        service_id: payload.service_id,
        user_id,
        date: parse_date_param(&payload.date)?,
        start_time: parse_time_param(&payload.start_time)?,
        end_time: parse_time_param(&payload.end_time)?,
        client_request_id: payload.client_request_id,
    };

    let booking = {
        let db = state.db.lock().unwrap();
        reservation::reserve(&db, &state.locks, &state.config, &request, Utc::now())?
    };

    Ok(Json(booking.into()))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    Ok(Json(booking.into()))
}

// POST /api/bookings/:id/confirm — payment-confirmation callback
#[derive(Deserialize)]
pub struct ConfirmPayload {
    pub payment_reference: String,
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ConfirmPayload>,
) -> Result<Json<BookingResponse>, AppError> {
    let (booking, newly_confirmed) = {
        let db = state.db.lock().unwrap();
        let was_pending = queries::get_booking_by_id(&db, &id)?
            .map(|b| b.status == BookingStatus::Pending)
            .unwrap_or(false);
        let booking =
            reservation::confirm(&db, &state.locks, &id, &payload.payment_reference)?;
        (booking, was_pending)
    };

    // Ledger and invoicing are fire-and-forget; their failures never roll
    // back the booking. Only a real transition emits, so a replayed webhook
    // does not double-report revenue.
    if newly_confirmed {
        let state = Arc::clone(&state);
        let confirmed = booking.clone();
        tokio::spawn(async move {
            if let Err(e) = state.events.booking_confirmed(&confirmed).await {
                tracing::warn!(booking_id = %confirmed.id, "booking event dispatch failed: {e}");
            }
        });
    }

    Ok(Json(booking.into()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        reservation::cancel(&db, &state.locks, &id)?
    };

    Ok(Json(booking.into()))
}
