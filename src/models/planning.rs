use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A scheduled defense slot. `date` is `YYYY-MM-DD`, `time` is `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Planning {
    pub id: String,
    pub topic_id: String,
    pub date: String,
    pub time: String,
    pub room: String,
    pub duration_minutes: i32,
    pub encadrant_id: String,
    pub rapporteur_id: String,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Planning {
    /// Minutes since midnight for the slot start, if `time` is well formed.
    pub fn start_minutes(&self) -> Option<i32> {
        parse_time_minutes(&self.time)
    }
}

pub fn parse_time_minutes(time: &str) -> Option<i32> {
    let (h, m) = time.split_once(':')?;
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

/// Half-open interval overlap on the same day.
pub fn slots_overlap(start_a: i32, duration_a: i32, start_b: i32, duration_b: i32) -> bool {
    start_a < start_b + duration_b && start_b < start_a + duration_a
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanningRequest {
    pub topic_id: String,
    pub date: String,
    pub time: String,
    pub room: String,
    pub duration_minutes: i32,
    pub encadrant_id: String,
    pub rapporteur_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePlanningRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub room: Option<String>,
    pub duration_minutes: Option<i32>,
    pub encadrant_id: Option<String>,
    pub rapporteur_id: Option<String>,
}
