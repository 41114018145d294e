use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Academic window kinds. Wire values match the historical API
/// (`choicePFA` is irregular on purpose).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum PeriodType {
    #[serde(rename = "pfa")]
    #[sqlx(rename = "pfa")]
    Pfa,
    #[serde(rename = "stageEte")]
    #[sqlx(rename = "stageEte")]
    StageEte,
    #[serde(rename = "choicePFA")]
    #[sqlx(rename = "choicePFA")]
    ChoicePfa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Closed,
    Open,
    ComingSoon,
}

impl PeriodStatus {
    /// Classify an instant against a period's boundaries.
    ///
    /// The end check runs first; both boundaries are inclusive on the Open
    /// side.
    pub fn classify(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> PeriodStatus {
        if now > end {
            PeriodStatus::Closed
        } else if now >= start {
            PeriodStatus::Open
        } else {
            PeriodStatus::ComingSoon
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Period {
    pub id: String,
    pub period_type: PeriodType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: String,
    pub updated_at: String,
}

impl Period {
    pub fn status_at(&self, now: DateTime<Utc>) -> PeriodStatus {
        PeriodStatus::classify(now, self.start_date, self.end_date)
    }

    pub fn with_status(self, now: DateTime<Utc>) -> PeriodWithStatus {
        let status = self.status_at(now);
        PeriodWithStatus { period: self, status }
    }
}

/// A period as returned by the API: the stored row plus its computed
/// status. The status is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodWithStatus {
    #[serde(flatten)]
    pub period: Period,
    pub status: PeriodStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPeriodRequest {
    pub period_type: PeriodType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePeriodRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
