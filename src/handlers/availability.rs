use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::availability;
use crate::state::AppState;

use super::parse_date_param;

// GET /api/resources/:id/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotViewResponse {
    resource_id: String,
    date: String,
    start_time: String,
    end_time: String,
    display_order: i32,
    price: Decimal,
    applied_rule_id: Option<i64>,
    status: String,
    reason: Option<String>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotViewResponse>>, AppError> {
    let date = parse_date_param(&query.date)?;

    let lock_ttl = chrono::Duration::minutes(state.config.lock_ttl_minutes as i64);
    let views = {
        let db = state.db.lock().unwrap();
        let resource = queries::get_resource(&db, &resource_id)?
            .ok_or_else(|| AppError::NotFound(format!("resource {resource_id}")))?;
        availability::project(&db, &resource, date, &state.locks, None, lock_ttl, Utc::now())?
    };

    let response = views
        .into_iter()
        .map(|v| SlotViewResponse {
            resource_id: v.identity.resource_id,
            date: v.identity.date.format("%Y-%m-%d").to_string(),
            start_time: v.identity.start_time.format("%H:%M").to_string(),
            end_time: v.identity.end_time.format("%H:%M").to_string(),
            display_order: v.display_order,
            price: v.price,
            applied_rule_id: v.applied_rule_id,
            status: v.status.as_str().to_string(),
            reason: v.reason,
        })
        .collect();

    Ok(Json(response))
}
