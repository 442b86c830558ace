use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, BookingStatus, Resource, SlotIdentity, SlotStatus, SlotView};
use crate::services::locks::SlotLockManager;
use crate::services::{pricing, slots};

/// Half-open interval intersection: overlap iff each starts before the
/// other ends. Adjacent windows (end == other.start) never overlap.
pub(crate) fn overlaps(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whether a booking still occupies its slot. CONFIRMED always does; a
/// PENDING booking only while its payment window (the lock TTL) is open.
/// An abandoned PENDING row stops blocking the moment the TTL lapses, the
/// same lazy expiry the lock table applies.
pub(crate) fn still_blocks(booking: &Booking, lock_ttl: Duration, now: DateTime<Utc>) -> bool {
    match booking.status {
        BookingStatus::Confirmed => true,
        BookingStatus::Pending => booking.created_at + lock_ttl > now.naive_utc(),
        _ => false,
    }
}

/// Project the live availability view for a resource on a date.
///
/// Read-only: merges generated slots, resolved prices, blocking bookings,
/// disable windows and foreign soft locks into per-slot statuses. Never
/// creates or releases locks. `requester` hides that caller's own hold so a
/// retrying client does not see its own lock as contention.
pub fn project(
    conn: &Connection,
    resource: &Resource,
    date: NaiveDate,
    locks: &SlotLockManager,
    requester: Option<&str>,
    lock_ttl: Duration,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<SlotView>> {
    let generated = slots::generate(&resource.slot_config);
    if generated.is_empty() {
        return Ok(Vec::new());
    }

    let bookings = queries::get_blocking_bookings(conn, &resource.id, date)?;
    let disabled = queries::get_disabled_windows(conn, &resource.id, date)?;
    let rules = queries::get_enabled_price_rules(conn, &resource.id)?;

    let views = generated
        .iter()
        .map(|slot| {
            let identity = SlotIdentity {
                resource_id: resource.id.clone(),
                date,
                start_time: slot.start_time,
                end_time: slot.end_time,
            };
            let quote = pricing::resolve(&resource.slot_config, &rules, slot, date);

            let (status, reason) = if bookings.iter().any(|b| {
                still_blocks(b, lock_ttl, now)
                    && overlaps(slot.start_time, slot.end_time, b.start_time, b.end_time)
            }) {
                (SlotStatus::Booked, Some("Booked".to_string()))
            } else if let Some(window) = disabled
                .iter()
                .find(|w| overlaps(slot.start_time, slot.end_time, w.start_time, w.end_time))
            {
                let reason = window
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Unavailable".to_string());
                (SlotStatus::Disabled, Some(reason))
            } else if locks
                .holder_of(&identity, now)
                .is_some_and(|holder| Some(holder.as_str()) != requester)
            {
                (SlotStatus::Held, Some("Temporarily reserved".to_string()))
            } else {
                (SlotStatus::Available, None)
            };

            SlotView {
                identity,
                display_order: slot.display_order,
                price: quote.price,
                applied_rule_id: quote.applied_rule_id,
                status,
                reason,
            }
        })
        .collect();

    Ok(views)
}
