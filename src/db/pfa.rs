use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, codes};
use crate::models::{
    Choice, NewChoiceRequest, NewTopicRequest, PfaTopic, Student, TopicStatus, UpdateChoiceRequest,
    UpdateTopicRequest,
};

pub async fn fetch_topics(
    db: &SqlitePool,
    year: Option<i32>,
    status: Option<TopicStatus>,
) -> Result<Vec<PfaTopic>, AppError> {
    let mut sql = "SELECT * FROM pfa_topics WHERE 1 = 1".to_string();
    if year.is_some() {
        sql.push_str(" AND year = ?");
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY updated_at DESC");

    let mut query = sqlx::query_as::<_, PfaTopic>(&sql);
    if let Some(year) = year {
        query = query.bind(year);
    }
    if let Some(status) = status {
        query = query.bind(status);
    }
    Ok(query.fetch_all(db).await?)
}

pub async fn find_topic_by_id(db: &SqlitePool, id: &str) -> Result<Option<PfaTopic>, AppError> {
    Ok(sqlx::query_as::<_, PfaTopic>("SELECT * FROM pfa_topics WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn insert_topic(db: &SqlitePool, req: NewTopicRequest) -> Result<PfaTopic, AppError> {
    let id = new_id();
    let ts = now();

    sqlx::query(
        "INSERT INTO pfa_topics
            (id, title, description, technologies, mode, year, teacher_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.technologies)
    .bind(req.mode)
    .bind(req.year)
    .bind(&req.teacher_id)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(PfaTopic {
        id,
        title: req.title,
        description: req.description,
        technologies: req.technologies,
        mode: req.mode,
        year: req.year,
        teacher_id: req.teacher_id,
        status: TopicStatus::Pending,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_topic(
    db: &SqlitePool,
    id: &str,
    req: UpdateTopicRequest,
) -> Result<Option<PfaTopic>, AppError> {
    let mut current = match find_topic_by_id(db, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(technologies) = req.technologies {
        current.technologies = technologies;
    }
    if let Some(mode) = req.mode {
        current.mode = mode;
    }
    if let Some(year) = req.year {
        current.year = year;
    }
    current.updated_at = now();

    sqlx::query(
        "UPDATE pfa_topics SET title = ?, description = ?, technologies = ?, mode = ?, year = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(&current.technologies)
    .bind(current.mode)
    .bind(current.year)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn set_topic_status(db: &SqlitePool, id: &str, status: TopicStatus) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE pfa_topics SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn delete_topic(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM pfa_topics WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn fetch_choices(db: &SqlitePool, topic_id: &str) -> Result<Vec<Choice>, AppError> {
    Ok(sqlx::query_as::<_, Choice>(
        "SELECT * FROM pfa_choices WHERE topic_id = ? ORDER BY priority, created_at",
    )
    .bind(topic_id)
    .fetch_all(db)
    .await?)
}

pub async fn find_choice_by_id(db: &SqlitePool, id: &str) -> Result<Option<Choice>, AppError> {
    Ok(sqlx::query_as::<_, Choice>("SELECT * FROM pfa_choices WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn insert_choice(
    db: &SqlitePool,
    topic_id: &str,
    req: NewChoiceRequest,
) -> Result<Choice, AppError> {
    let taken: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pfa_choices WHERE topic_id = ? AND student_id = ?")
            .bind(topic_id)
            .bind(&req.student_id)
            .fetch_one(db)
            .await?;
    if taken > 0 {
        return Err(AppError::conflict(
            codes::ALREADY_EXISTS,
            "This student has already chosen this topic",
        ));
    }

    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO pfa_choices
            (id, topic_id, student_id, priority, accepted_by_teacher, validated, created_at)
         VALUES (?, ?, ?, ?, 0, 0, ?)",
    )
    .bind(&id)
    .bind(topic_id)
    .bind(&req.student_id)
    .bind(req.priority)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Choice {
        id,
        topic_id: topic_id.to_string(),
        student_id: req.student_id,
        priority: req.priority,
        accepted_by_teacher: false,
        validated: false,
        created_at: ts,
    })
}

pub async fn update_choice(
    db: &SqlitePool,
    id: &str,
    req: UpdateChoiceRequest,
) -> Result<Option<Choice>, AppError> {
    let mut current = match find_choice_by_id(db, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    if let Some(accepted) = req.accepted_by_teacher {
        current.accepted_by_teacher = accepted;
    }
    if let Some(validated) = req.validated {
        current.validated = validated;
    }

    sqlx::query("UPDATE pfa_choices SET accepted_by_teacher = ?, validated = ? WHERE id = ?")
        .bind(current.accepted_by_teacher)
        .bind(current.validated)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

pub async fn fetch_assigned_students(db: &SqlitePool, topic_id: &str) -> Result<Vec<Student>, AppError> {
    Ok(sqlx::query_as::<_, Student>(
        "SELECT st.* FROM students st
         JOIN pfa_topic_students ts ON ts.student_id = st.id
         WHERE ts.topic_id = ?
         ORDER BY st.last_name",
    )
    .bind(topic_id)
    .fetch_all(db)
    .await?)
}

pub async fn assigned_count(db: &SqlitePool, topic_id: &str) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM pfa_topic_students WHERE topic_id = ?")
            .bind(topic_id)
            .fetch_one(db)
            .await?,
    )
}

pub async fn assign_student(db: &SqlitePool, topic_id: &str, student_id: &str) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO pfa_topic_students (topic_id, student_id) VALUES (?, ?)")
        .bind(topic_id)
        .bind(student_id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;
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

    fn topic_req() -> NewTopicRequest {
        NewTopicRequest {
            title: "Realtime chat platform".to_string(),
            description: "Websocket chat with presence".to_string(),
            technologies: "Rust, Axum, SQLite".to_string(),
            mode: Mode::Binome,
            year: 2025,
            teacher_id: None,
        }
    }

    #[tokio::test]
    async fn test_new_topic_starts_pending() {
        let pool = setup_test_db().await;
        let topic = insert_topic(&pool, topic_req()).await.expect("insert");
        assert_eq!(topic.status, TopicStatus::Pending);

        assert!(set_topic_status(&pool, &topic.id, TopicStatus::Published).await.unwrap());
        let loaded = find_topic_by_id(&pool, &topic.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TopicStatus::Published);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let pool = setup_test_db().await;
        let a = insert_topic(&pool, topic_req()).await.unwrap();
        let mut req = topic_req();
        req.title = "Compiler playground".to_string();
        insert_topic(&pool, req).await.unwrap();

        set_topic_status(&pool, &a.id, TopicStatus::Published).await.unwrap();

        let published = fetch_topics(&pool, None, Some(TopicStatus::Published)).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, a.id);

        let pending = fetch_topics(&pool, Some(2025), Some(TopicStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_choice_is_unique_per_student_and_topic() {
        let pool = setup_test_db().await;
        let topic = insert_topic(&pool, topic_req()).await.unwrap();

        let student = crate::db::users::insert_student(
            &pool,
            crate::models::NewStudentRequest {
                first_name: "Omar".to_string(),
                last_name: "Jlassi".to_string(),
                email: "omar@uni.tn".to_string(),
                level: "4".to_string(),
            },
        )
        .await
        .unwrap();

        insert_choice(
            &pool,
            &topic.id,
            NewChoiceRequest {
                student_id: student.id.clone(),
                priority: 1,
            },
        )
        .await
        .unwrap();

        let err = insert_choice(
            &pool,
            &topic.id,
            NewChoiceRequest {
                student_id: student.id.clone(),
                priority: 2,
            },
        )
        .await
        .expect_err("second choice for the same topic should fail");
        assert!(matches!(err, AppError::Conflict { code, .. } if code == codes::ALREADY_EXISTS));
    }
}
