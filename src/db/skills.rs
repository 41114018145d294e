use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, codes};
use crate::models::{NewSkillRequest, Skill, SubjectRef, UpdateSkillRequest};

pub async fn fetch_skills(db: &SqlitePool, include_archived: bool) -> Result<Vec<Skill>, AppError> {
    let sql = if include_archived {
        "SELECT * FROM skills ORDER BY updated_at DESC"
    } else {
        "SELECT * FROM skills WHERE is_archived = 0 ORDER BY updated_at DESC"
    };
    Ok(sqlx::query_as::<_, Skill>(sql).fetch_all(db).await?)
}

pub async fn find_skill_by_id(db: &SqlitePool, id: &str) -> Result<Option<Skill>, AppError> {
    Ok(sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn insert_skill(db: &SqlitePool, req: NewSkillRequest) -> Result<Skill, AppError> {
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skills WHERE name = ?")
        .bind(&req.name)
        .fetch_one(db)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict(
            codes::ALREADY_EXISTS,
            format!("A skill named {} already exists", req.name),
        ));
    }

    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO skills (id, name, description, is_archived, created_at, updated_at)
         VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    set_subjects(db, &id, &req.subject_ids).await?;

    Ok(Skill {
        id,
        name: req.name,
        description: req.description,
        is_archived: false,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_skill(
    db: &SqlitePool,
    id: &str,
    req: UpdateSkillRequest,
) -> Result<Option<Skill>, AppError> {
    let mut current = match find_skill_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }
    current.updated_at = now();

    sqlx::query("UPDATE skills SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&current.name)
        .bind(&current.description)
        .bind(&current.updated_at)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

/// Replace the set of subjects the skill is linked to.
pub async fn set_subjects(db: &SqlitePool, skill_id: &str, subject_ids: &[String]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM skill_subjects WHERE skill_id = ?")
        .bind(skill_id)
        .execute(db)
        .await?;
    for subject_id in subject_ids {
        sqlx::query("INSERT OR IGNORE INTO skill_subjects (skill_id, subject_id) VALUES (?, ?)")
            .bind(skill_id)
            .bind(subject_id)
            .execute(db)
            .await?;
    }
    Ok(())
}

pub async fn fetch_subject_refs(db: &SqlitePool, skill_id: &str) -> Result<Vec<SubjectRef>, AppError> {
    Ok(sqlx::query_as::<_, SubjectRef>(
        "SELECT s.id, s.title FROM subjects s
         JOIN skill_subjects ss ON ss.subject_id = s.id
         WHERE ss.skill_id = ?
         ORDER BY s.title",
    )
    .bind(skill_id)
    .fetch_all(db)
    .await?)
}

pub async fn linked_subject_count(db: &SqlitePool, skill_id: &str) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM skill_subjects WHERE skill_id = ?")
            .bind(skill_id)
            .fetch_one(db)
            .await?,
    )
}

pub async fn delete_skill(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM skills WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn archive_skill(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_archived(db, id, true).await
}

pub async fn restore_skill(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_archived(db, id, false).await
}

async fn set_archived(db: &SqlitePool, id: &str, archived: bool) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE skills SET is_archived = ?, updated_at = ? WHERE id = ?")
        .bind(archived)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}
