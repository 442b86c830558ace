use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingStatus, DayType, DisabledSlot, PriceBreakdown, PriceRule, Resource, SlotConfig,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| anyhow::anyhow!("invalid date {s}: {e}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT).map_err(|e| anyhow::anyhow!("invalid time {s}: {e}"))
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|e| anyhow::anyhow!("invalid datetime {s}: {e}"))
}

fn parse_decimal(s: &str) -> anyhow::Result<Decimal> {
    s.parse::<Decimal>()
        .map_err(|e| anyhow::anyhow!("invalid decimal {s}: {e}"))
}

fn parse_opt_decimal(s: Option<String>) -> anyhow::Result<Option<Decimal>> {
    s.map(|v| parse_decimal(&v)).transpose()
}

// ── Resources ──

pub fn create_resource(conn: &Connection, resource: &Resource) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO resources (id, name, venue_id, enabled, opening_time, closing_time, slot_duration_minutes, base_price, weekend_multiplier)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            resource.id,
            resource.name,
            resource.venue_id,
            resource.enabled as i32,
            resource.slot_config.opening_time.format(TIME_FMT).to_string(),
            resource.slot_config.closing_time.format(TIME_FMT).to_string(),
            resource.slot_config.slot_duration_minutes,
            resource.slot_config.base_price.to_string(),
            resource.slot_config.weekend_multiplier.map(|m| m.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_resource(conn: &Connection, id: &str) -> anyhow::Result<Option<Resource>> {
    let result = conn.query_row(
        "SELECT id, name, venue_id, enabled, opening_time, closing_time, slot_duration_minutes, base_price, weekend_multiplier
         FROM resources WHERE id = ?1",
        params![id],
        |row| Ok(parse_resource_row(row)),
    );

    match result {
        Ok(resource) => Ok(Some(resource?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_resources(conn: &Connection) -> anyhow::Result<Vec<Resource>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, venue_id, enabled, opening_time, closing_time, slot_duration_minutes, base_price, weekend_multiplier
         FROM resources ORDER BY name ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_resource_row(row)))?;

    let mut resources = vec![];
    for row in rows {
        resources.push(row??);
    }
    Ok(resources)
}

pub fn update_slot_config(conn: &Connection, id: &str, config: &SlotConfig) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE resources SET opening_time = ?1, closing_time = ?2, slot_duration_minutes = ?3,
                base_price = ?4, weekend_multiplier = ?5, enabled = ?6, updated_at = datetime('now')
         WHERE id = ?7",
        params![
            config.opening_time.format(TIME_FMT).to_string(),
            config.closing_time.format(TIME_FMT).to_string(),
            config.slot_duration_minutes,
            config.base_price.to_string(),
            config.weekend_multiplier.map(|m| m.to_string()),
            config.enabled as i32,
            id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_resource_row(row: &rusqlite::Row) -> anyhow::Result<Resource> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let venue_id: Option<String> = row.get(2)?;
    let enabled: bool = row.get::<_, i32>(3)? != 0;
    let opening: String = row.get(4)?;
    let closing: String = row.get(5)?;
    let slot_duration_minutes: i32 = row.get(6)?;
    let base_price: String = row.get(7)?;
    let weekend_multiplier: Option<String> = row.get(8)?;

    Ok(Resource {
        id,
        name,
        venue_id,
        enabled,
        slot_config: SlotConfig {
            opening_time: parse_time(&opening)?,
            closing_time: parse_time(&closing)?,
            slot_duration_minutes,
            base_price: parse_decimal(&base_price)?,
            weekend_multiplier: parse_opt_decimal(weekend_multiplier)?,
            enabled,
        },
    })
}

// ── Price rules ──

pub fn create_price_rule(conn: &Connection, rule: &PriceRule) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO price_rules (resource_id, day_type, specific_date, start_time, end_time, base_price, extra_charge, priority, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rule.resource_id,
            rule.day_type.as_str(),
            rule.specific_date.map(|d| d.format(DATE_FMT).to_string()),
            rule.start_time.format(TIME_FMT).to_string(),
            rule.end_time.format(TIME_FMT).to_string(),
            rule.base_price.map(|p| p.to_string()),
            rule.extra_charge.map(|c| c.to_string()),
            rule.priority,
            rule.enabled as i32,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_enabled_price_rules(conn: &Connection, resource_id: &str) -> anyhow::Result<Vec<PriceRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, resource_id, day_type, specific_date, start_time, end_time, base_price, extra_charge, priority, enabled
         FROM price_rules WHERE resource_id = ?1 AND enabled = 1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![resource_id], |row| Ok(parse_price_rule_row(row)))?;

    let mut rules = vec![];
    for row in rows {
        rules.push(row??);
    }
    Ok(rules)
}

pub fn list_price_rules(conn: &Connection, resource_id: &str) -> anyhow::Result<Vec<PriceRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, resource_id, day_type, specific_date, start_time, end_time, base_price, extra_charge, priority, enabled
         FROM price_rules WHERE resource_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![resource_id], |row| Ok(parse_price_rule_row(row)))?;

    let mut rules = vec![];
    for row in rows {
        rules.push(row??);
    }
    Ok(rules)
}

pub fn set_price_rule_enabled(conn: &Connection, id: i64, enabled: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE price_rules SET enabled = ?1 WHERE id = ?2",
        params![enabled as i32, id],
    )?;
    Ok(count > 0)
}

fn parse_price_rule_row(row: &rusqlite::Row) -> anyhow::Result<PriceRule> {
    let id: i64 = row.get(0)?;
    let resource_id: String = row.get(1)?;
    let day_type: String = row.get(2)?;
    let specific_date: Option<String> = row.get(3)?;
    let start_time: String = row.get(4)?;
    let end_time: String = row.get(5)?;
    let base_price: Option<String> = row.get(6)?;
    let extra_charge: Option<String> = row.get(7)?;
    let priority: i32 = row.get(8)?;
    let enabled: bool = row.get::<_, i32>(9)? != 0;

    Ok(PriceRule {
        id,
        resource_id,
        day_type: DayType::parse(&day_type),
        specific_date: specific_date.as_deref().map(parse_date).transpose()?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        base_price: parse_opt_decimal(base_price)?,
        extra_charge: parse_opt_decimal(extra_charge)?,
        priority,
        enabled,
    })
}

// ── Disabled slots ──

pub fn create_disabled_slot(conn: &Connection, window: &DisabledSlot) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO disabled_slots (resource_id, date, start_time, end_time, reason, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            window.resource_id,
            window.date.format(DATE_FMT).to_string(),
            window.start_time.format(TIME_FMT).to_string(),
            window.end_time.format(TIME_FMT).to_string(),
            window.reason,
            window.enabled as i32,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_disabled_windows(
    conn: &Connection,
    resource_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<DisabledSlot>> {
    let date_str = date.format(DATE_FMT).to_string();
    let mut stmt = conn.prepare(
        "SELECT id, resource_id, date, start_time, end_time, reason, enabled
         FROM disabled_slots WHERE resource_id = ?1 AND date = ?2 AND enabled = 1 ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![resource_id, date_str], |row| {
        Ok(parse_disabled_slot_row(row))
    })?;

    let mut windows = vec![];
    for row in rows {
        windows.push(row??);
    }
    Ok(windows)
}

pub fn list_disabled_slots(
    conn: &Connection,
    resource_id: &str,
    date: Option<NaiveDate>,
) -> anyhow::Result<Vec<DisabledSlot>> {
    let mut windows = vec![];
    match date {
        Some(d) => {
            let date_str = d.format(DATE_FMT).to_string();
            let mut stmt = conn.prepare(
                "SELECT id, resource_id, date, start_time, end_time, reason, enabled
                 FROM disabled_slots WHERE resource_id = ?1 AND date = ?2 ORDER BY start_time ASC",
            )?;
            let rows = stmt.query_map(params![resource_id, date_str], |row| {
                Ok(parse_disabled_slot_row(row))
            })?;
            for row in rows {
                windows.push(row??);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, resource_id, date, start_time, end_time, reason, enabled
                 FROM disabled_slots WHERE resource_id = ?1 ORDER BY date ASC, start_time ASC",
            )?;
            let rows = stmt.query_map(params![resource_id], |row| {
                Ok(parse_disabled_slot_row(row))
            })?;
            for row in rows {
                windows.push(row??);
            }
        }
    }
    Ok(windows)
}

pub fn set_disabled_slot_enabled(conn: &Connection, id: i64, enabled: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE disabled_slots SET enabled = ?1 WHERE id = ?2",
        params![enabled as i32, id],
    )?;
    Ok(count > 0)
}

fn parse_disabled_slot_row(row: &rusqlite::Row) -> anyhow::Result<DisabledSlot> {
    let id: i64 = row.get(0)?;
    let resource_id: String = row.get(1)?;
    let date: String = row.get(2)?;
    let start_time: String = row.get(3)?;
    let end_time: String = row.get(4)?;
    let reason: Option<String> = row.get(5)?;
    let enabled: bool = row.get::<_, i32>(6)? != 0;

    Ok(DisabledSlot {
        id,
        resource_id,
        date: parse_date(&date)?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        reason,
        enabled,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, reference, resource_id, service_id, user_id, booking_date, start_time, end_time, subtotal, platform_fee, total_amount, online_amount, venue_amount, applied_rule_id, status, client_request_id, payment_reference, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, reference, resource_id, service_id, user_id, booking_date, start_time, end_time, subtotal, platform_fee, total_amount, online_amount, venue_amount, applied_rule_id, status, client_request_id, payment_reference, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            booking.id,
            booking.reference,
            booking.resource_id,
            booking.service_id,
            booking.user_id,
            booking.booking_date.format(DATE_FMT).to_string(),
            booking.start_time.format(TIME_FMT).to_string(),
            booking.end_time.format(TIME_FMT).to_string(),
            booking.amount.subtotal.to_string(),
            booking.amount.platform_fee.to_string(),
            booking.amount.total.to_string(),
            booking.amount.online_amount.to_string(),
            booking.amount.venue_amount.to_string(),
            booking.applied_rule_id,
            booking.status.as_str(),
            booking.client_request_id,
            booking.payment_reference,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_client_request_id(
    conn: &Connection,
    client_request_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE client_request_id = ?1");
    let result = conn.query_row(&sql, params![client_request_id], |row| {
        Ok(parse_booking_row(row))
    });

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Bookings that occupy slots on the given date: PENDING and CONFIRMED only.
pub fn get_blocking_bookings(
    conn: &Connection,
    resource_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let date_str = date.format(DATE_FMT).to_string();
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE resource_id = ?1 AND booking_date = ?2 AND status IN ('pending', 'confirmed')
         ORDER BY start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params![resource_id, date_str], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    payment_reference: Option<&str>,
) -> anyhow::Result<bool> {
    let now = chrono::Utc::now()
        .naive_utc()
        .format(DATETIME_FMT)
        .to_string();
    let count = match payment_reference {
        Some(reference) => conn.execute(
            "UPDATE bookings SET status = ?1, payment_reference = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), reference, now, id],
        )?,
        None => conn.execute(
            "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?,
    };
    Ok(count > 0)
}

/// PENDING bookings created before the cutoff, for the reconciliation sweep.
pub fn get_stale_pending(
    conn: &Connection,
    cutoff: NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let cutoff_str = cutoff.format(DATETIME_FMT).to_string();
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE status = 'pending' AND created_at < ?1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params![cutoff_str], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let reference: String = row.get(1)?;
    let resource_id: String = row.get(2)?;
    let service_id: Option<String> = row.get(3)?;
    let user_id: String = row.get(4)?;
    let booking_date: String = row.get(5)?;
    let start_time: String = row.get(6)?;
    let end_time: String = row.get(7)?;
    let subtotal: String = row.get(8)?;
    let platform_fee: String = row.get(9)?;
    let total: String = row.get(10)?;
    let online_amount: String = row.get(11)?;
    let venue_amount: String = row.get(12)?;
    let applied_rule_id: Option<i64> = row.get(13)?;
    let status: String = row.get(14)?;
    let client_request_id: Option<String> = row.get(15)?;
    let payment_reference: Option<String> = row.get(16)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    Ok(Booking {
        id,
        reference,
        resource_id,
        service_id,
        user_id,
        booking_date: parse_date(&booking_date)?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        amount: PriceBreakdown {
            subtotal: parse_decimal(&subtotal)?,
            platform_fee: parse_decimal(&platform_fee)?,
            total: parse_decimal(&total)?,
            online_amount: parse_decimal(&online_amount)?,
            venue_amount: parse_decimal(&venue_amount)?,
        },
        applied_rule_id,
        status: BookingStatus::parse(&status),
        client_request_id,
        payment_reference,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}
