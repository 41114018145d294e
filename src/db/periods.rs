use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::AppError;
use crate::models::{NewPeriodRequest, Period, PeriodType, UpdatePeriodRequest};

pub async fn fetch_periods(db: &SqlitePool) -> Result<Vec<Period>, AppError> {
    Ok(
        sqlx::query_as::<_, Period>("SELECT * FROM periods ORDER BY start_date")
            .fetch_all(db)
            .await?,
    )
}

pub async fn find_period_by_id(db: &SqlitePool, id: &str) -> Result<Option<Period>, AppError> {
    Ok(sqlx::query_as::<_, Period>("SELECT * FROM periods WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// True when another period of the same type has a range intersecting
/// `[start, end]`.
pub async fn overlapping_exists(
    db: &SqlitePool,
    period_type: PeriodType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM periods
         WHERE period_type = ?
           AND start_date <= ?
           AND end_date >= ?
           AND id != IFNULL(?, '')",
    )
    .bind(period_type)
    .bind(end)
    .bind(start)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn insert_period(db: &SqlitePool, req: NewPeriodRequest) -> Result<Period, AppError> {
    let id = new_id();
    let ts = now();

    sqlx::query(
        "INSERT INTO periods (id, period_type, start_date, end_date, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(req.period_type)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Period {
        id,
        period_type: req.period_type,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_period(
    db: &SqlitePool,
    id: &str,
    req: UpdatePeriodRequest,
) -> Result<Option<Period>, AppError> {
    let mut current = match find_period_by_id(db, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    if let Some(start_date) = req.start_date {
        current.start_date = start_date;
    }
    if let Some(end_date) = req.end_date {
        current.end_date = end_date;
    }
    current.updated_at = now();

    sqlx::query("UPDATE periods SET start_date = ?, end_date = ?, updated_at = ? WHERE id = ?")
        .bind(current.start_date)
        .bind(current.end_date)
        .bind(&current.updated_at)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

pub async fn delete_period(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM periods WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_period_round_trip() {
        let pool = setup_test_db().await;

        let period = insert_period(
            &pool,
            NewPeriodRequest {
                period_type: PeriodType::Pfa,
                start_date: at(2025, 1, 1),
                end_date: at(2025, 1, 31),
            },
        )
        .await
        .expect("insert");

        let loaded = find_period_by_id(&pool, &period.id)
            .await
            .expect("fetch")
            .expect("exists");
        assert_eq!(loaded.period_type, PeriodType::Pfa);
        assert_eq!(loaded.start_date, at(2025, 1, 1));
        assert_eq!(loaded.end_date, at(2025, 1, 31));
    }

    #[tokio::test]
    async fn test_overlap_detection_is_per_type() {
        let pool = setup_test_db().await;

        insert_period(
            &pool,
            NewPeriodRequest {
                period_type: PeriodType::Pfa,
                start_date: at(2025, 1, 1),
                end_date: at(2025, 1, 31),
            },
        )
        .await
        .unwrap();

        // Same type, intersecting range.
        assert!(
            overlapping_exists(&pool, PeriodType::Pfa, at(2025, 1, 20), at(2025, 2, 10), None)
                .await
                .unwrap()
        );
        // Same type, disjoint range.
        assert!(
            !overlapping_exists(&pool, PeriodType::Pfa, at(2025, 2, 1), at(2025, 2, 28), None)
                .await
                .unwrap()
        );
        // Different type, intersecting range.
        assert!(
            !overlapping_exists(&pool, PeriodType::StageEte, at(2025, 1, 20), at(2025, 2, 10), None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_overlap_check_can_exclude_the_period_being_updated() {
        let pool = setup_test_db().await;

        let period = insert_period(
            &pool,
            NewPeriodRequest {
                period_type: PeriodType::ChoicePfa,
                start_date: at(2025, 3, 1),
                end_date: at(2025, 3, 15),
            },
        )
        .await
        .unwrap();

        assert!(
            !overlapping_exists(
                &pool,
                PeriodType::ChoicePfa,
                at(2025, 3, 5),
                at(2025, 3, 20),
                Some(&period.id)
            )
            .await
            .unwrap()
        );
    }
}
