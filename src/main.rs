use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use turfbook::config::AppConfig;
use turfbook::db;
use turfbook::handlers;
use turfbook::services::events::{BookingEventSink, NoopEventSink, WebhookEventSink};
use turfbook::services::locks::SlotLockManager;
use turfbook::services::sweeper;
use turfbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let events: Box<dyn BookingEventSink> =
        if config.ledger_webhook_url.is_empty() && config.invoice_webhook_url.is_empty() {
            tracing::info!("no webhook endpoints configured, booking events disabled");
            Box::new(NoopEventSink)
        } else {
            tracing::info!(
                ledger = %config.ledger_webhook_url,
                invoice = %config.invoice_webhook_url,
                "dispatching booking events to webhooks"
            );
            Box::new(WebhookEventSink::new(
                config.ledger_webhook_url.clone(),
                config.invoice_webhook_url.clone(),
            ))
        };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        locks: SlotLockManager::new(),
        events,
    });

    tokio::spawn(sweeper::run_sweeper(Arc::clone(&state)));

    let app = Router::new()
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
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
