use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{DayType, DisabledSlot, PriceRule, Resource, SlotConfig};
use crate::state::AppState;

use super::bookings::BookingResponse;
use super::{parse_date_param, parse_decimal_param, parse_time_param};

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// ── Resources ──

#[derive(Deserialize)]
pub struct CreateResourcePayload {
    pub id: Option<String>,
    pub name: String,
    pub venue_id: Option<String>,
    pub opening_time: String,
    pub closing_time: String,
    pub slot_duration_minutes: i32,
    pub base_price: String,
    pub weekend_multiplier: Option<String>,
}

#[derive(Serialize)]
pub struct ResourceResponse {
    id: String,
    name: String,
    venue_id: Option<String>,
    enabled: bool,
    opening_time: String,
    closing_time: String,
    slot_duration_minutes: i32,
    base_price: String,
    weekend_multiplier: Option<String>,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        ResourceResponse {
            id: r.id,
            name: r.name,
            venue_id: r.venue_id,
            enabled: r.enabled,
            opening_time: r.slot_config.opening_time.format("%H:%M").to_string(),
            closing_time: r.slot_config.closing_time.format("%H:%M").to_string(),
            slot_duration_minutes: r.slot_config.slot_duration_minutes,
            base_price: r.slot_config.base_price.to_string(),
            weekend_multiplier: r.slot_config.weekend_multiplier.map(|m| m.to_string()),
        }
    }
}

pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateResourcePayload>,
) -> Result<Json<ResourceResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let resource = Resource {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        venue_id: payload.venue_id,
        enabled: true,
        slot_config: SlotConfig {
            opening_time: parse_time_param(&payload.opening_time)?,
            closing_time: parse_time_param(&payload.closing_time)?,
            slot_duration_minutes: payload.slot_duration_minutes,
            base_price: parse_decimal_param("base_price", &payload.base_price)?,
            weekend_multiplier: payload
                .weekend_multiplier
                .as_deref()
                .map(|m| parse_decimal_param("weekend_multiplier", m))
                .transpose()?,
            enabled: true,
        },
    };

    if resource.slot_config.opening_time >= resource.slot_config.closing_time {
        return Err(AppError::Validation(
            "opening_time must be before closing_time".to_string(),
        ));
    }
    if resource.slot_config.slot_duration_minutes <= 0 {
        return Err(AppError::Validation(
            "slot_duration_minutes must be positive".to_string(),
        ));
    }

    {
        let db = state.db.lock().unwrap();
        queries::create_resource(&db, &resource)?;
    }

    tracing::info!(resource_id = %resource.id, "resource created");
    Ok(Json(resource.into()))
}

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResourceResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let resources = {
        let db = state.db.lock().unwrap();
        queries::list_resources(&db)?
    };

    Ok(Json(resources.into_iter().map(Into::into).collect()))
}

// POST /api/admin/resources/:id/slot-config
#[derive(Deserialize)]
pub struct SlotConfigPayload {
    pub opening_time: String,
    pub closing_time: String,
    pub slot_duration_minutes: i32,
    pub base_price: String,
    pub weekend_multiplier: Option<String>,
    pub enabled: bool,
}

pub async fn update_slot_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<SlotConfigPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let config = SlotConfig {
        opening_time: parse_time_param(&payload.opening_time)?,
        closing_time: parse_time_param(&payload.closing_time)?,
        slot_duration_minutes: payload.slot_duration_minutes,
        base_price: parse_decimal_param("base_price", &payload.base_price)?,
        weekend_multiplier: payload
            .weekend_multiplier
            .as_deref()
            .map(|m| parse_decimal_param("weekend_multiplier", m))
            .transpose()?,
        enabled: payload.enabled,
    };

    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_slot_config(&db, &id, &config)?
    };

    if updated {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("resource {id}")))
    }
}

// ── Price rules ──

#[derive(Deserialize)]
pub struct CreatePriceRulePayload {
    pub resource_id: String,
    pub day_type: String,
    pub specific_date: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub base_price: Option<String>,
    pub extra_charge: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Serialize)]
pub struct PriceRuleResponse {
    id: i64,
    resource_id: String,
    day_type: String,
    specific_date: Option<String>,
    start_time: String,
    end_time: String,
    base_price: Option<String>,
    extra_charge: Option<String>,
    priority: i32,
    enabled: bool,
}

impl From<PriceRule> for PriceRuleResponse {
    fn from(r: PriceRule) -> Self {
        PriceRuleResponse {
            id: r.id,
            resource_id: r.resource_id,
            day_type: r.day_type.as_str().to_string(),
            specific_date: r.specific_date.map(|d| d.format("%Y-%m-%d").to_string()),
            start_time: r.start_time.format("%H:%M").to_string(),
            end_time: r.end_time.format("%H:%M").to_string(),
            base_price: r.base_price.map(|p| p.to_string()),
            extra_charge: r.extra_charge.map(|c| c.to_string()),
            priority: r.priority,
            enabled: r.enabled,
        }
    }
}

pub async fn create_price_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreatePriceRulePayload>,
) -> Result<Json<PriceRuleResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let day_type = DayType::parse(&payload.day_type);
    let specific_date = payload
        .specific_date
        .as_deref()
        .map(parse_date_param)
        .transpose()?;
    if day_type == DayType::Date && specific_date.is_none() {
        return Err(AppError::Validation(
            "day_type \"date\" requires specific_date".to_string(),
        ));
    }

    let mut rule = PriceRule {
        id: 0,
        resource_id: payload.resource_id,
        day_type,
        specific_date,
        start_time: parse_time_param(&payload.start_time)?,
        end_time: parse_time_param(&payload.end_time)?,
        base_price: payload
            .base_price
            .as_deref()
            .map(|p| parse_decimal_param("base_price", p))
            .transpose()?,
        extra_charge: payload
            .extra_charge
            .as_deref()
            .map(|c| parse_decimal_param("extra_charge", c))
            .transpose()?,
        priority: payload.priority.unwrap_or(0),
        enabled: true,
    };

    if rule.start_time >= rule.end_time {
        return Err(AppError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    rule.id = {
        let db = state.db.lock().unwrap();
        queries::get_resource(&db, &rule.resource_id)?
            .ok_or_else(|| AppError::NotFound(format!("resource {}", rule.resource_id)))?;
        queries::create_price_rule(&db, &rule)?
    };

    tracing::info!(rule_id = rule.id, resource_id = %rule.resource_id, "price rule created");
    Ok(Json(rule.into()))
}

#[derive(Deserialize)]
pub struct PriceRulesQuery {
    pub resource_id: String,
}

pub async fn list_price_rules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PriceRulesQuery>,
) -> Result<Json<Vec<PriceRuleResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let rules = {
        let db = state.db.lock().unwrap();
        queries::list_price_rules(&db, &query.resource_id)?
    };

    Ok(Json(rules.into_iter().map(Into::into).collect()))
}

// POST /api/admin/price-rules/:id/disable — soft delete
pub async fn disable_price_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::set_price_rule_enabled(&db, id, false)?
    };

    if updated {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("price rule {id}")))
    }
}

// ── Disabled slots ──

#[derive(Deserialize)]
pub struct CreateDisabledSlotPayload {
    pub resource_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct DisabledSlotResponse {
    id: i64,
    resource_id: String,
    date: String,
    start_time: String,
    end_time: String,
    reason: Option<String>,
    enabled: bool,
}

impl From<DisabledSlot> for DisabledSlotResponse {
    fn from(w: DisabledSlot) -> Self {
        DisabledSlotResponse {
            id: w.id,
            resource_id: w.resource_id,
            date: w.date.format("%Y-%m-%d").to_string(),
            start_time: w.start_time.format("%H:%M").to_string(),
            end_time: w.end_time.format("%H:%M").to_string(),
            reason: w.reason,
            enabled: w.enabled,
        }
    }
}

pub async fn create_disabled_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateDisabledSlotPayload>,
) -> Result<Json<DisabledSlotResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let mut window = DisabledSlot {
        id: 0,
        resource_id: payload.resource_id,
        date: parse_date_param(&payload.date)?,
        start_time: parse_time_param(&payload.start_time)?,
        end_time: parse_time_param(&payload.end_time)?,
        reason: payload.reason,
        enabled: true,
    };

    if window.start_time >= window.end_time {
        return Err(AppError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    window.id = {
        let db = state.db.lock().unwrap();
        queries::get_resource(&db, &window.resource_id)?
            .ok_or_else(|| AppError::NotFound(format!("resource {}", window.resource_id)))?;
        queries::create_disabled_slot(&db, &window)?
    };

    tracing::info!(
        window_id = window.id,
        resource_id = %window.resource_id,
        date = %window.date,
        "disable window created"
    );
    Ok(Json(window.into()))
}

#[derive(Deserialize)]
pub struct DisabledSlotsQuery {
    pub resource_id: String,
    pub date: Option<String>,
}

pub async fn list_disabled_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DisabledSlotsQuery>,
) -> Result<Json<Vec<DisabledSlotResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = query.date.as_deref().map(parse_date_param).transpose()?;
    let windows = {
        let db = state.db.lock().unwrap();
        queries::list_disabled_slots(&db, &query.resource_id, date)?
    };

    Ok(Json(windows.into_iter().map(Into::into).collect()))
}

// POST /api/admin/disabled-slots/:id/lift
pub async fn lift_disabled_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::set_disabled_slot_enabled(&db, id, false)?
    };

    if updated {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("disable window {id}")))
    }
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_all_bookings(&db, query.status.as_deref(), limit)?
    };

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}
