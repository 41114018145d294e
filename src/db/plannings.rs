use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::AppError;
use crate::models::{NewPlanningRequest, Planning, UpdatePlanningRequest};
use crate::models::planning::{parse_time_minutes, slots_overlap};

pub async fn fetch_plannings(db: &SqlitePool, published_only: bool) -> Result<Vec<Planning>, AppError> {
    let sql = if published_only {
        "SELECT * FROM plannings WHERE is_published = 1 ORDER BY date, time"
    } else {
        "SELECT * FROM plannings ORDER BY date, time"
    };
    Ok(sqlx::query_as::<_, Planning>(sql).fetch_all(db).await?)
}

pub async fn find_planning_by_id(db: &SqlitePool, id: &str) -> Result<Option<Planning>, AppError> {
    Ok(sqlx::query_as::<_, Planning>("SELECT * FROM plannings WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// True when another slot occupies the same room on the same date for an
/// intersecting time window. Times are minutes-granular, so the handful of
/// rows per day is checked in memory.
pub async fn conflicting_slot_exists(
    db: &SqlitePool,
    date: &str,
    room: &str,
    time: &str,
    duration_minutes: i32,
    exclude_id: Option<&str>,
) -> Result<bool, AppError> {
    let start = match parse_time_minutes(time) {
        Some(m) => m,
        None => return Ok(false),
    };

    let same_room = sqlx::query_as::<_, Planning>(
        "SELECT * FROM plannings WHERE date = ? AND room = ? AND id != IFNULL(?, '')",
    )
    .bind(date)
    .bind(room)
    .bind(exclude_id)
    .fetch_all(db)
    .await?;

    Ok(same_room.iter().any(|other| {
        other
            .start_minutes()
            .is_some_and(|other_start| {
                slots_overlap(start, duration_minutes, other_start, other.duration_minutes)
            })
    }))
}

pub async fn insert_planning(db: &SqlitePool, req: NewPlanningRequest) -> Result<Planning, AppError> {
    let id = new_id();
    let ts = now();

    sqlx::query(
        "INSERT INTO plannings
            (id, topic_id, date, time, room, duration_minutes, encadrant_id, rapporteur_id,
            is_published, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&req.topic_id)
    .bind(&req.date)
    .bind(&req.time)
    .bind(&req.room)
    .bind(req.duration_minutes)
    .bind(&req.encadrant_id)
    .bind(&req.rapporteur_id)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Planning {
        id,
        topic_id: req.topic_id,
        date: req.date,
        time: req.time,
        room: req.room,
        duration_minutes: req.duration_minutes,
        encadrant_id: req.encadrant_id,
        rapporteur_id: req.rapporteur_id,
        is_published: false,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_planning(
    db: &SqlitePool,
    id: &str,
    req: UpdatePlanningRequest,
) -> Result<Option<Planning>, AppError> {
    let mut current = match find_planning_by_id(db, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    if let Some(date) = req.date {
        current.date = date;
    }
    if let Some(time) = req.time {
        current.time = time;
    }
    if let Some(room) = req.room {
        current.room = room;
    }
    if let Some(duration_minutes) = req.duration_minutes {
        current.duration_minutes = duration_minutes;
    }
    if let Some(encadrant_id) = req.encadrant_id {
        current.encadrant_id = encadrant_id;
    }
    if let Some(rapporteur_id) = req.rapporteur_id {
        current.rapporteur_id = rapporteur_id;
    }
    current.updated_at = now();

    sqlx::query(
        "UPDATE plannings
         SET date = ?, time = ?, room = ?, duration_minutes = ?, encadrant_id = ?, rapporteur_id = ?,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(&current.date)
    .bind(&current.time)
    .bind(&current.room)
    .bind(current.duration_minutes)
    .bind(&current.encadrant_id)
    .bind(&current.rapporteur_id)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn publish_planning(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE plannings SET is_published = 1, updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

/// Publish every slot; returns how many were still unpublished.
pub async fn publish_all(db: &SqlitePool) -> Result<u64, AppError> {
    let affected = sqlx::query("UPDATE plannings SET is_published = 1, updated_at = ? WHERE is_published = 0")
        .bind(now())
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected)
}

pub async fn delete_planning(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM plannings WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}
