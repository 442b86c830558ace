use std::env;

use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Platform fee, percent of the resolved slot price.
    pub platform_fee_percent: Decimal,
    /// Share of the total collected online in advance; the rest is due at
    /// the venue.
    pub advance_percent: Decimal,
    pub lock_ttl_minutes: u32,
    pub sweep_interval_secs: u64,
    pub ledger_webhook_url: String,
    pub invoice_webhook_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "turfbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            platform_fee_percent: env::var("PLATFORM_FEE_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| Decimal::from(5)),
            advance_percent: env::var("ADVANCE_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| Decimal::from(50)),
            lock_ttl_minutes: env::var("LOCK_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            ledger_webhook_url: env::var("LEDGER_WEBHOOK_URL").unwrap_or_default(),
            invoice_webhook_url: env::var("INVOICE_WEBHOOK_URL").unwrap_or_default(),
        }
    }
}
