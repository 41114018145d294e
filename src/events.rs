use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{PeriodType, PeriodStatus};

/// Domain events published on the in-process bus.
///
/// Replaces the ad-hoc cross-component notification the old frontend used
/// (a browser event fired when a new academic year was created) with an
/// explicit typed channel.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    YearCreated {
        label: String,
    },
    PeriodOpened {
        period_id: String,
        period_type: PeriodType,
    },
    PeriodClosed {
        period_id: String,
        period_type: PeriodType,
    },
}

impl AppEvent {
    pub fn from_transition(period_id: &str, period_type: PeriodType, to: PeriodStatus) -> Option<Self> {
        match to {
            PeriodStatus::Open => Some(AppEvent::PeriodOpened {
                period_id: period_id.to_string(),
                period_type,
            }),
            PeriodStatus::Closed => Some(AppEvent::PeriodClosed {
                period_id: period_id.to_string(),
                period_type,
            }),
            PeriodStatus::ComingSoon => None,
        }
    }
}

/// Publish/subscribe hub backed by `tokio::sync::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Lack of subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        debug!("publishing event: {:?}", event);
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
