use sqlx::SqlitePool;

use crate::events::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: EventBus,
}
