use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::events::BookingEventSink;
use crate::services::locks::SlotLockManager;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub locks: SlotLockManager,
    pub events: Box<dyn BookingEventSink>,
}
