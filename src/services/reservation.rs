use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::queries;
use crate::models::{
    Booking, BookingStatus, PriceBreakdown, Resource, SlotIdentity, SlotStatus, SlotView,
};
use crate::services::availability;
use crate::services::locks::{AcquireOutcome, SlotLockManager};
use crate::services::pricing::round_money;
use crate::services::slots;

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub resource_id: String,
    pub service_id: Option<String>,
    pub user_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub client_request_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("slot is no longer available: {0}")]
    SlotUnavailable(String),

    #[error("slot is temporarily held by another booking attempt")]
    SlotLocked,

    #[error("booking is {current}, cannot {action}")]
    InvalidTransition {
        current: &'static str,
        action: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The lock holder token for a booking attempt: the client request id when
/// supplied (so a retried request refreshes rather than conflicts), else
/// the booking id.
fn holder_token(client_request_id: Option<&str>, booking_id: &str) -> String {
    client_request_id.unwrap_or(booking_id).to_string()
}

fn new_reference() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("BK-{}", raw[..10].to_uppercase())
}

/// Fee-and-split breakdown on top of a resolved slot price.
pub fn compute_breakdown(
    subtotal: Decimal,
    platform_fee_percent: Decimal,
    advance_percent: Decimal,
) -> PriceBreakdown {
    let platform_fee = round_money(subtotal * platform_fee_percent / Decimal::ONE_HUNDRED);
    let total = subtotal + platform_fee;
    let online_amount = round_money(total * advance_percent / Decimal::ONE_HUNDRED);
    let venue_amount = total - online_amount;
    PriceBreakdown {
        subtotal,
        platform_fee,
        total,
        online_amount,
        venue_amount,
    }
}

/// Reserve one derived slot.
///
/// Validates the request against the live availability view, enforces
/// at-most-once semantics for a supplied client request id, takes the soft
/// lock, re-validates at write time, and creates the PENDING booking. The
/// lock is released on any failure after acquisition; conflicts surface as
/// business outcomes, never as faults.
pub fn reserve(
    conn: &Connection,
    locks: &SlotLockManager,
    config: &AppConfig,
    request: &ReserveRequest,
    now: DateTime<Utc>,
) -> Result<Booking, ReservationError> {
    if request.start_time >= request.end_time {
        return Err(ReservationError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }
    let today = now.date_naive();
    if request.date < today {
        return Err(ReservationError::Validation(
            "booking date is in the past".to_string(),
        ));
    }
    if request.date == today && request.start_time <= now.time() {
        return Err(ReservationError::Validation(
            "slot start time has already passed".to_string(),
        ));
    }

    let resource = queries::get_resource(conn, &request.resource_id)?
        .ok_or_else(|| ReservationError::ResourceNotFound(request.resource_id.clone()))?;
    if !resource.enabled {
        return Err(ReservationError::Validation(
            "resource is not accepting bookings".to_string(),
        ));
    }

    // At-most-once: a replayed request id returns the prior attempt's
    // booking in whatever state it has reached.
    if let Some(token) = request.client_request_id.as_deref() {
        if let Some(existing) = queries::get_booking_by_client_request_id(conn, token)? {
            tracing::info!(booking_id = %existing.id, "duplicate client_request_id, returning existing booking");
            return Ok(existing);
        }
    }

    let generated = slots::generate(&resource.slot_config);
    generated
        .iter()
        .find(|s| s.start_time == request.start_time && s.end_time == request.end_time)
        .ok_or_else(|| {
            ReservationError::Validation(
                "requested window does not match a bookable slot".to_string(),
            )
        })?;

    let booking_id = Uuid::new_v4().to_string();
    let holder = holder_token(request.client_request_id.as_deref(), &booking_id);
    let identity = SlotIdentity {
        resource_id: resource.id.clone(),
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
    };

    let ttl = Duration::minutes(config.lock_ttl_minutes as i64);

    // Liveness check before taking the lock.
    project_available_slot(conn, &resource, &identity, locks, &holder, ttl, now)?;

    if locks.acquire(&identity, &holder, ttl, now) == AcquireOutcome::Conflict {
        return Err(ReservationError::SlotLocked);
    }

    // Re-validate and write while holding the lock; release on any failure
    // so no orphaned lock outlives a failed attempt.
    let result = write_pending(
        conn, locks, config, &resource, request, &identity, &booking_id, &holder, now,
    );
    if result.is_err() {
        locks.release(&identity, &holder);
    }
    result
}

/// Project the single requested slot and require it to be AVAILABLE.
fn project_available_slot(
    conn: &Connection,
    resource: &Resource,
    identity: &SlotIdentity,
    locks: &SlotLockManager,
    holder: &str,
    lock_ttl: Duration,
    now: DateTime<Utc>,
) -> Result<SlotView, ReservationError> {
    let views =
        availability::project(conn, resource, identity.date, locks, Some(holder), lock_ttl, now)?;
    let view = views
        .into_iter()
        .find(|v| v.identity == *identity)
        .ok_or_else(|| {
            ReservationError::Validation(
                "requested window does not match a bookable slot".to_string(),
            )
        })?;

    match view.status {
        SlotStatus::Available => Ok(view),
        SlotStatus::Booked => Err(ReservationError::SlotUnavailable(
            "slot is already booked".to_string(),
        )),
        SlotStatus::Disabled => Err(ReservationError::SlotUnavailable(
            view.reason
                .unwrap_or_else(|| "slot is not open for booking".to_string()),
        )),
        SlotStatus::Held => Err(ReservationError::SlotLocked),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_pending(
    conn: &Connection,
    locks: &SlotLockManager,
    config: &AppConfig,
    resource: &Resource,
    request: &ReserveRequest,
    identity: &SlotIdentity,
    booking_id: &str,
    holder: &str,
    now: DateTime<Utc>,
) -> Result<Booking, ReservationError> {
    let ttl = Duration::minutes(config.lock_ttl_minutes as i64);
    let view = project_available_slot(conn, resource, identity, locks, holder, ttl, now)?;

    // A stale PENDING occupant no longer blocks the view, but its row must
    // leave {PENDING, CONFIRMED} before a new booking takes the identity.
    // Its lock has already lapsed (our acquire would have conflicted
    // otherwise), so expiring it releases nothing of ours.
    for occupant in queries::get_blocking_bookings(conn, &resource.id, identity.date)? {
        if occupant.status == BookingStatus::Pending
            && availability::overlaps(
                identity.start_time,
                identity.end_time,
                occupant.start_time,
                occupant.end_time,
            )
            && !availability::still_blocks(&occupant, ttl, now)
        {
            expire(conn, locks, &occupant.id)?;
        }
    }

    let created_at = now.naive_utc();
    let booking = Booking {
        id: booking_id.to_string(),
        reference: new_reference(),
        resource_id: resource.id.clone(),
        service_id: request.service_id.clone(),
        user_id: request.user_id.clone(),
        booking_date: identity.date,
        start_time: identity.start_time,
        end_time: identity.end_time,
        amount: compute_breakdown(
            view.price,
            config.platform_fee_percent,
            config.advance_percent,
        ),
        applied_rule_id: view.applied_rule_id,
        status: BookingStatus::Pending,
        client_request_id: request.client_request_id.clone(),
        payment_reference: None,
        created_at,
        updated_at: created_at,
    };

    if let Err(e) = queries::create_booking(conn, &booking) {
        // Unique-constraint backstop for a racing duplicate request id:
        // fetch-or-fail rather than double-insert. The prior attempt owns
        // the lock under the same token, so nothing is released here.
        if let Some(token) = request.client_request_id.as_deref() {
            if let Ok(Some(existing)) = queries::get_booking_by_client_request_id(conn, token) {
                return Ok(existing);
            }
        }
        return Err(ReservationError::Storage(e));
    }

    tracing::info!(
        booking_id = %booking.id,
        resource_id = %booking.resource_id,
        date = %booking.booking_date,
        start = %booking.start_time,
        "booking created in pending state"
    );
    Ok(booking)
}

/// Payment-confirmation callback. Idempotent: confirming an already
/// CONFIRMED booking returns it unchanged.
pub fn confirm(
    conn: &Connection,
    locks: &SlotLockManager,
    booking_id: &str,
    payment_reference: &str,
) -> Result<Booking, ReservationError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))?;

    match booking.status {
        BookingStatus::Confirmed => Ok(booking),
        BookingStatus::Pending => {
            queries::update_booking_status(
                conn,
                &booking.id,
                BookingStatus::Confirmed,
                Some(payment_reference),
            )?;
            let holder = holder_token(booking.client_request_id.as_deref(), &booking.id);
            locks.release(&booking.slot_identity(), &holder);
            tracing::info!(booking_id = %booking.id, payment_reference, "booking confirmed");
            queries::get_booking_by_id(conn, booking_id)?
                .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))
        }
        BookingStatus::Cancelled => Err(ReservationError::InvalidTransition {
            current: "cancelled",
            action: "confirm",
        }),
        BookingStatus::Expired => Err(ReservationError::InvalidTransition {
            current: "expired",
            action: "confirm",
        }),
    }
}

/// Explicit cancellation. Releases the lock synchronously so the slot is
/// bookable again without waiting for TTL expiry.
pub fn cancel(
    conn: &Connection,
    locks: &SlotLockManager,
    booking_id: &str,
) -> Result<Booking, ReservationError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))?;

    match booking.status {
        BookingStatus::Cancelled => Ok(booking),
        BookingStatus::Pending => {
            queries::update_booking_status(conn, &booking.id, BookingStatus::Cancelled, None)?;
            let holder = holder_token(booking.client_request_id.as_deref(), &booking.id);
            locks.release(&booking.slot_identity(), &holder);
            tracing::info!(booking_id = %booking.id, "booking cancelled");
            queries::get_booking_by_id(conn, booking_id)?
                .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))
        }
        BookingStatus::Confirmed => Err(ReservationError::InvalidTransition {
            current: "confirmed",
            action: "cancel",
        }),
        BookingStatus::Expired => Err(ReservationError::InvalidTransition {
            current: "expired",
            action: "cancel",
        }),
    }
}

/// System-driven timeout of one PENDING booking. Terminal like CANCELLED
/// but distinguishes the sweep from an explicit user cancellation.
pub fn expire(
    conn: &Connection,
    locks: &SlotLockManager,
    booking_id: &str,
) -> Result<Booking, ReservationError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))?;

    if booking.status != BookingStatus::Pending {
        // already resolved by a confirm/cancel that raced the sweep
        return Ok(booking);
    }

    queries::update_booking_status(conn, &booking.id, BookingStatus::Expired, None)?;
    let holder = holder_token(booking.client_request_id.as_deref(), &booking.id);
    locks.release(&booking.slot_identity(), &holder);
    tracing::info!(booking_id = %booking.id, "pending booking expired");
    queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))
}

/// Reconciliation: force-expire PENDING bookings whose lock TTL has lapsed.
/// A booking whose holder still has an active lock (a refreshed attempt) is
/// left alone. Returns how many were expired.
pub fn sweep_expired_pending(
    conn: &Connection,
    locks: &SlotLockManager,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<usize, ReservationError> {
    let cutoff = now.naive_utc() - Duration::minutes(config.lock_ttl_minutes as i64);
    let stale = queries::get_stale_pending(conn, cutoff)?;
    let mut count = 0;
    for booking in stale {
        let holder = holder_token(booking.client_request_id.as_deref(), &booking.id);
        if locks.holder_of(&booking.slot_identity(), now).as_deref() == Some(holder.as_str()) {
            continue;
        }
        expire(conn, locks, &booking.id)?;
        count += 1;
    }
    Ok(count)
}
