use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, codes};
use crate::models::{NewYearRequest, Year};

pub async fn fetch_years(db: &SqlitePool) -> Result<Vec<Year>, AppError> {
    Ok(sqlx::query_as::<_, Year>("SELECT * FROM years ORDER BY label DESC")
        .fetch_all(db)
        .await?)
}

pub async fn insert_year(db: &SqlitePool, req: NewYearRequest) -> Result<Year, AppError> {
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM years WHERE label = ?")
        .bind(&req.label)
        .fetch_one(db)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict(
            codes::ALREADY_EXISTS,
            format!("Academic year {} already exists", req.label),
        ));
    }

    let id = new_id();
    let ts = now();
    sqlx::query("INSERT INTO years (id, label, created_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&req.label)
        .bind(&ts)
        .execute(db)
        .await?;

    Ok(Year {
        id,
        label: req.label,
        created_at: ts,
    })
}
