use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::periods;
use crate::error::AppError;
use crate::events::{AppEvent, EventBus};
use crate::models::PeriodStatus;

/// Background task that re-classifies every period on a fixed interval and
/// publishes an event when one crosses a boundary (opens or closes).
///
/// The first observation of a period only records its status, so restarts
/// do not replay transitions that happened long ago.
pub struct PeriodWatcher {
    db: SqlitePool,
    events: EventBus,
    interval: Duration,
    seen: HashMap<String, PeriodStatus>,
}

impl PeriodWatcher {
    pub fn new(db: SqlitePool, events: EventBus, interval_secs: u64) -> Self {
        Self {
            db,
            events,
            interval: Duration::from_secs(interval_secs),
            seen: HashMap::new(),
        }
    }

    pub async fn start(mut self) {
        info!("Starting period watcher (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.tick().await {
                Ok(0) => {}
                Ok(n) => info!("Period watcher published {} transition(s)", n),
                Err(e) => {
                    warn!("Period watcher tick failed: {:?}", e);
                    // keep ticking
                }
            }
        }
    }

    /// One pass over all periods. Returns how many transition events were
    /// published.
    pub async fn tick(&mut self) -> Result<usize, AppError> {
        let now = Utc::now();
        let periods = periods::fetch_periods(&self.db).await?;

        let mut published = 0;
        for period in periods {
            let status = period.status_at(now);
            match self.seen.insert(period.id.clone(), status) {
                None => {}
                Some(previous) if previous == status => {}
                Some(_) => {
                    if let Some(event) = AppEvent::from_transition(&period.id, period.period_type, status) {
                        self.events.publish(event);
                        published += 1;
                    }
                }
            }
        }

        Ok(published)
    }
}
