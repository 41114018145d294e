use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, codes};
use crate::models::{
    NewStudentRequest, NewTeacherRequest, Student, Teacher, UpdateStudentRequest, UpdateTeacherRequest,
};

pub async fn fetch_students(db: &SqlitePool, include_archived: bool) -> Result<Vec<Student>, AppError> {
    let sql = if include_archived {
        "SELECT * FROM students ORDER BY updated_at DESC"
    } else {
        "SELECT * FROM students WHERE is_archived = 0 ORDER BY updated_at DESC"
    };
    Ok(sqlx::query_as::<_, Student>(sql).fetch_all(db).await?)
}

pub async fn find_student_by_id(db: &SqlitePool, id: &str) -> Result<Option<Student>, AppError> {
    Ok(sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn insert_student(db: &SqlitePool, req: NewStudentRequest) -> Result<Student, AppError> {
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE email = ?")
        .bind(&req.email)
        .fetch_one(db)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict(
            codes::ALREADY_EXISTS,
            format!("A student with email {} already exists", req.email),
        ));
    }

    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO students (id, first_name, last_name, email, level, is_archived, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.level)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Student {
        id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        level: req.level,
        is_archived: false,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_student(
    db: &SqlitePool,
    id: &str,
    req: UpdateStudentRequest,
) -> Result<Option<Student>, AppError> {
    let mut current = match find_student_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(first_name) = req.first_name {
        current.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        current.last_name = last_name;
    }
    if let Some(email) = req.email {
        current.email = email;
    }
    if let Some(level) = req.level {
        current.level = level;
    }
    current.updated_at = now();

    sqlx::query(
        "UPDATE students SET first_name = ?, last_name = ?, email = ?, level = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&current.first_name)
    .bind(&current.last_name)
    .bind(&current.email)
    .bind(&current.level)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

/// Number of places a student is still referenced from.
pub async fn student_link_count(db: &SqlitePool, id: &str) -> Result<i64, AppError> {
    let links: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM subject_students WHERE student_id = ?1)
              + (SELECT COUNT(*) FROM pfa_topic_students WHERE student_id = ?1)
              + (SELECT COUNT(*) FROM pfa_choices WHERE student_id = ?1)",
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(links)
}

pub async fn delete_student(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn archive_student(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_student_archived(db, id, true).await
}

pub async fn restore_student(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_student_archived(db, id, false).await
}

async fn set_student_archived(db: &SqlitePool, id: &str, archived: bool) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE students SET is_archived = ?, updated_at = ? WHERE id = ?")
        .bind(archived)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn fetch_teachers(db: &SqlitePool, include_archived: bool) -> Result<Vec<Teacher>, AppError> {
    let sql = if include_archived {
        "SELECT * FROM teachers ORDER BY updated_at DESC"
    } else {
        "SELECT * FROM teachers WHERE is_archived = 0 ORDER BY updated_at DESC"
    };
    Ok(sqlx::query_as::<_, Teacher>(sql).fetch_all(db).await?)
}

pub async fn find_teacher_by_id(db: &SqlitePool, id: &str) -> Result<Option<Teacher>, AppError> {
    Ok(sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn insert_teacher(db: &SqlitePool, req: NewTeacherRequest) -> Result<Teacher, AppError> {
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers WHERE email = ?")
        .bind(&req.email)
        .fetch_one(db)
        .await?;
    if taken > 0 {
        return Err(AppError::conflict(
            codes::ALREADY_EXISTS,
            format!("A teacher with email {} already exists", req.email),
        ));
    }

    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO teachers (id, first_name, last_name, email, grade, is_archived, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.grade)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Teacher {
        id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        grade: req.grade,
        is_archived: false,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_teacher(
    db: &SqlitePool,
    id: &str,
    req: UpdateTeacherRequest,
) -> Result<Option<Teacher>, AppError> {
    let mut current = match find_teacher_by_id(db, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(first_name) = req.first_name {
        current.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        current.last_name = last_name;
    }
    if let Some(email) = req.email {
        current.email = email;
    }
    if let Some(grade) = req.grade {
        current.grade = Some(grade);
    }
    current.updated_at = now();

    sqlx::query(
        "UPDATE teachers SET first_name = ?, last_name = ?, email = ?, grade = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&current.first_name)
    .bind(&current.last_name)
    .bind(&current.email)
    .bind(&current.grade)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn teacher_link_count(db: &SqlitePool, id: &str) -> Result<i64, AppError> {
    let links: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM subjects WHERE teacher_id = ?1)
              + (SELECT COUNT(*) FROM pfa_topics WHERE teacher_id = ?1)
              + (SELECT COUNT(*) FROM plannings WHERE encadrant_id = ?1 OR rapporteur_id = ?1)",
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(links)
}

pub async fn delete_teacher(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn archive_teacher(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_teacher_archived(db, id, true).await
}

pub async fn restore_teacher(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_teacher_archived(db, id, false).await
}

async fn set_teacher_archived(db: &SqlitePool, id: &str, archived: bool) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE teachers SET is_archived = ?, updated_at = ? WHERE id = ?")
        .bind(archived)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn student_req(email: &str) -> NewStudentRequest {
        NewStudentRequest {
            first_name: "Amine".to_string(),
            last_name: "Ben Salah".to_string(),
            email: email.to_string(),
            level: "4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_student() {
        let pool = setup_test_db().await;

        let student = insert_student(&pool, student_req("amine@uni.tn"))
            .await
            .expect("Failed to insert student");
        assert_eq!(student.email, "amine@uni.tn");
        assert!(!student.is_archived);

        let students = fetch_students(&pool, false).await.expect("Failed to fetch");
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, student.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let pool = setup_test_db().await;

        insert_student(&pool, student_req("amine@uni.tn")).await.unwrap();
        let err = insert_student(&pool, student_req("amine@uni.tn"))
            .await
            .expect_err("duplicate email should fail");
        assert!(matches!(err, AppError::Conflict { code, .. } if code == codes::ALREADY_EXISTS));
    }

    #[tokio::test]
    async fn test_archive_hides_student_from_default_listing() {
        let pool = setup_test_db().await;

        let student = insert_student(&pool, student_req("amine@uni.tn")).await.unwrap();
        assert!(archive_student(&pool, &student.id).await.unwrap());

        assert_eq!(fetch_students(&pool, false).await.unwrap().len(), 0);
        assert_eq!(fetch_students(&pool, true).await.unwrap().len(), 1);

        assert!(restore_student(&pool, &student.id).await.unwrap());
        assert_eq!(fetch_students(&pool, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_teacher_merges_fields() {
        let pool = setup_test_db().await;

        let teacher = insert_teacher(
            &pool,
            NewTeacherRequest {
                first_name: "Salma".to_string(),
                last_name: "Gharbi".to_string(),
                email: "salma@uni.tn".to_string(),
                grade: None,
            },
        )
        .await
        .unwrap();

        let updated = update_teacher(
            &pool,
            &teacher.id,
            UpdateTeacherRequest {
                first_name: None,
                last_name: None,
                email: None,
                grade: Some("Maitre assistant".to_string()),
            },
        )
        .await
        .unwrap()
        .expect("teacher exists");

        assert_eq!(updated.first_name, "Salma");
        assert_eq!(updated.grade.as_deref(), Some("Maitre assistant"));
    }
}
