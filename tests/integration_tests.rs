use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use turfbook::config::AppConfig;
use turfbook::db::{self, queries};
use turfbook::handlers;
use turfbook::models::{Booking, Resource, SlotConfig};
use turfbook::services::events::BookingEventSink;
use turfbook::services::locks::SlotLockManager;
use turfbook::state::AppState;

// ── Mock event sink ──

struct RecordingEventSink {
    confirmed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BookingEventSink for RecordingEventSink {
    async fn booking_confirmed(&self, booking: &Booking) -> anyhow::Result<()> {
        self.confirmed.lock().unwrap().push(booking.id.clone());
        Ok(())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        platform_fee_percent: dec!(5),
        advance_percent: dec!(50),
        lock_ttl_minutes: 7,
        sweep_interval_secs: 60,
        ledger_webhook_url: String::new(),
        invoice_webhook_url: String::new(),
    }
}

fn test_state() -> (Arc<AppState>, Arc<Mutex<Vec<String>>>) {
    let conn = db::init_db(":memory:").unwrap();

    let resource = Resource {
        id: "turf-1".to_string(),
        name: "Turf One".to_string(),
        venue_id: Some("venue-1".to_string()),
        enabled: true,
        slot_config: SlotConfig {
            opening_time: chrono::NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            closing_time: chrono::NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            slot_duration_minutes: 60,
            base_price: dec!(1000),
            weekend_multiplier: Some(dec!(1.2)),
            enabled: true,
        },
    };
    queries::create_resource(&conn, &resource).unwrap();

    let confirmed = Arc::new(Mutex::new(vec![]));
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        locks: SlotLockManager::new(),
        events: Box::new(RecordingEventSink {
            confirmed: Arc::clone(&confirmed),
        }),
    });
    (state, confirmed)
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/resources/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route("/api/bookings", post(handlers::bookings::reserve))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/confirm",
            post(handlers::bookings::confirm_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/admin/resources",
            get(handlers::admin::list_resources).post(handlers::admin::create_resource),
        )
        .route(
            "/api/admin/resources/:id/slot-config",
            post(handlers::admin::update_slot_config),
        )
        .route(
            "/api/admin/price-rules",
            get(handlers::admin::list_price_rules).post(handlers::admin::create_price_rule),
        )
        .route(
            "/api/admin/price-rules/:id/disable",
            post(handlers::admin::disable_price_rule),
        )
        .route(
            "/api/admin/disabled-slots",
            get(handlers::admin::list_disabled_slots).post(handlers::admin::create_disabled_slot),
        )
        .route(
            "/api/admin/disabled-slots/:id/lift",
            post(handlers::admin::lift_disabled_slot),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .with_state(state)
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// 2030-04-01 is a Monday, 2030-04-06 a Saturday; both far enough ahead to
// never trip the past-date check.
const WEEKDAY: &str = "2030-04-01";
const WEEKEND: &str = "2030-04-06";

fn reserve_request(date: &str, start: &str, end: &str, client_request_id: Option<&str>) -> Request<Body> {
    let mut payload = serde_json::json!({
        "resource_id": "turf-1",
        "date": date,
        "start_time": start,
        "end_time": end,
    });
    if let Some(token) = client_request_id {
        payload["client_request_id"] = serde_json::json!(token);
    }
    Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .header("X-User-Id", "user-1")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn admin_post(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

// ── Availability ──

#[tokio::test]
async fn test_availability_lists_generated_slots() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let slots = json.as_array().unwrap();
    // 06:00-22:00 in 60-minute slots
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0]["start_time"], "06:00");
    assert_eq!(slots[0]["end_time"], "07:00");
    assert_eq!(slots[0]["status"], "available");
    assert_eq!(slots[0]["price"], "1000.00");
    assert_eq!(slots[15]["end_time"], "22:00");
}

#[tokio::test]
async fn test_availability_weekend_multiplier() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKEND}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(res).await;
    assert_eq!(json[0]["price"], "1200.00");
}

#[tokio::test]
async fn test_availability_unknown_resource() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/nope/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Reserve ──

#[tokio::test]
async fn test_reserve_creates_pending_booking() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", None))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["amount"]["subtotal"], "1000.00");
    assert_eq!(json["amount"]["platform_fee"], "50.00");
    assert_eq!(json["amount"]["total"], "1050.00");
    assert_eq!(json["amount"]["online_amount"], "525.00");
    assert_eq!(json["amount"]["venue_amount"], "525.00");
    assert!(json["reference"].as_str().unwrap().starts_with("BK-"));

    // the slot now shows as booked
    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json[1]["start_time"], "07:00");
    assert_eq!(json[1]["status"], "booked");
    assert_eq!(json[1]["reason"], "Booked");
}

#[tokio::test]
async fn test_reserve_requires_user_header() {
    let (state, _) = test_state();
    let app = test_app(state);

    let payload = serde_json::json!({
        "resource_id": "turf-1",
        "date": WEEKDAY,
        "start_time": "07:00",
        "end_time": "08:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["code"], "VALIDATION");
}

#[tokio::test]
async fn test_reserve_idempotent_client_request_id() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("req-1")))
        .await
        .unwrap();
    let first = body_json(res).await;

    let app = test_app(state);
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("req-1")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let second = body_json(res).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["status"], "pending");
}

#[tokio::test]
async fn test_reserve_conflict_for_taken_slot() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("first")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("second")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let json = body_json(res).await;
    assert!(
        json["code"] == "SLOT_UNAVAILABLE" || json["code"] == "SLOT_ALREADY_LOCKED",
        "unexpected code: {}",
        json["code"]
    );
}

#[tokio::test]
async fn test_reserve_validation_errors() {
    let (state, _) = test_state();

    // malformed date
    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request("not-a-date", "07:00", "08:00", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // past date
    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request("2020-01-01", "07:00", "08:00", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // window that is not a generated slot
    let app = test_app(state);
    let res = app
        .oneshot(reserve_request(WEEKDAY, "06:30", "07:30", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Confirm / cancel ──

#[tokio::test]
async fn test_confirm_flow_with_event_dispatch() {
    let (state, confirmed_events) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", None))
        .await
        .unwrap();
    let booking = body_json(res).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_confirm_request(&id, "pay-42"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["payment_reference"], "pay-42");

    // confirming again is a no-op returning the same state
    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_confirm_request(&id, "pay-43"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["payment_reference"], "pay-42");

    // the revenue fact fires exactly once
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(confirmed_events.lock().unwrap().as_slice(), [id]);
}

fn admin_confirm_request(id: &str, payment_reference: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/bookings/{id}/confirm"))
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({ "payment_reference": payment_reference }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_cancel_reopens_slot() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("a")))
        .await
        .unwrap();
    let booking = body_json(res).await;
    let id = booking["id"].as_str().unwrap();

    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/bookings/{id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "cancelled");

    // slot is available again and a new attempt succeeds
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json[1]["status"], "available");

    let app = test_app(state);
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", Some("b")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cancel_confirmed_booking_rejected() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "07:00", "08:00", None))
        .await
        .unwrap();
    let booking = body_json(res).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let app = test_app(state.clone());
    app.oneshot(admin_confirm_request(&id, "pay-1")).await.unwrap();

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/bookings/{id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let json = body_json(res).await;
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_get_booking_not_found() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/bookings/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Admin ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/resources")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/resources")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_disable_window_blocks_booking() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_post(
            "/api/admin/disabled-slots",
            serde_json::json!({
                "resource_id": "turf-1",
                "date": WEEKDAY,
                "start_time": "07:30",
                "end_time": "09:30",
                "reason": "Maintenance",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let window = body_json(res).await;
    let window_id = window["id"].as_i64().unwrap();

    // every intersecting slot is disabled whole
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json[1]["status"], "disabled"); // 07:00-08:00
    assert_eq!(json[1]["reason"], "Maintenance");
    assert_eq!(json[2]["status"], "disabled"); // 08:00-09:00
    assert_eq!(json[3]["status"], "disabled"); // 09:00-10:00
    assert_eq!(json[4]["status"], "available");

    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKDAY, "08:00", "09:00", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let json = body_json(res).await;
    assert_eq!(json["code"], "SLOT_UNAVAILABLE");

    // lifting the window reopens the slots
    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_post(
            &format!("/api/admin/disabled-slots/{window_id}/lift"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(reserve_request(WEEKDAY, "08:00", "09:00", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_price_rule_affects_quote_and_booking() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_post(
            "/api/admin/price-rules",
            serde_json::json!({
                "resource_id": "turf-1",
                "day_type": "weekend",
                "start_time": "07:00",
                "end_time": "08:00",
                "extra_charge": "200",
                "priority": 5,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rule = body_json(res).await;
    let rule_id = rule["id"].as_i64().unwrap();

    // 1000 * 1.2 + 200 on the covered weekend slot, 1200 elsewhere
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKEND}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json[1]["price"], "1400.00");
    assert_eq!(json[1]["applied_rule_id"], rule_id);
    assert_eq!(json[0]["price"], "1200.00");

    // the booking's breakdown is computed off the resolved price
    let app = test_app(state.clone());
    let res = app
        .oneshot(reserve_request(WEEKEND, "07:00", "08:00", None))
        .await
        .unwrap();
    let booking = body_json(res).await;
    assert_eq!(booking["amount"]["subtotal"], "1400.00");
    assert_eq!(booking["amount"]["platform_fee"], "70.00");
    assert_eq!(booking["amount"]["total"], "1470.00");

    // disabling the rule reverts future quotes
    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_post(
            &format!("/api/admin/price-rules/{rule_id}/disable"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/turf-1/availability?date={WEEKEND}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    // 07:00 slot is booked now, but its price no longer carries the rule
    assert_eq!(json[1]["applied_rule_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_admin_create_resource_end_to_end() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(admin_post(
            "/api/admin/resources",
            serde_json::json!({
                "id": "court-9",
                "name": "Court Nine",
                "opening_time": "09:00",
                "closing_time": "11:30",
                "slot_duration_minutes": 60,
                "base_price": "500",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 09:00-11:30 with hourly slots: the 11:00-12:00 partial is dropped
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/resources/court-9/availability?date={WEEKDAY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    let slots = json.as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1]["end_time"], "11:00");
    assert_eq!(slots[0]["price"], "500.00");

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/resources")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_bookings_listing() {
    let (state, _) = test_state();

    let app = test_app(state.clone());
    app.oneshot(reserve_request(WEEKDAY, "07:00", "08:00", None))
        .await
        .unwrap();

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/bookings?status=pending")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["status"], "pending");
}
