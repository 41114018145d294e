use sqlx::{FromRow, SqlitePool};

use crate::db::{new_id, now};
use crate::error::AppError;
use crate::models::{
    Curriculum, Evaluation, NewEvaluationRequest, NewPropositionRequest, NewSubjectRequest,
    ProgressEntry, Proposition, Student, Subject, UpdateSubjectRequest,
};
use crate::progress::UnitRef;

/// Raw row; `curriculum` stays JSON text until decoded into the model.
#[derive(FromRow)]
struct SubjectRow {
    id: String,
    title: String,
    level: String,
    semester: String,
    year: i32,
    curriculum: String,
    teacher_id: Option<String>,
    is_published: bool,
    is_archived: bool,
    created_at: String,
    updated_at: String,
}

impl SubjectRow {
    fn into_subject(self) -> Result<Subject, AppError> {
        let curriculum: Curriculum = serde_json::from_str(&self.curriculum)?;
        Ok(Subject {
            id: self.id,
            title: self.title,
            level: self.level,
            semester: self.semester,
            year: self.year,
            curriculum,
            teacher_id: self.teacher_id,
            is_published: self.is_published,
            is_archived: self.is_archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn fetch_subjects(db: &SqlitePool, include_archived: bool) -> Result<Vec<Subject>, AppError> {
    let sql = if include_archived {
        "SELECT * FROM subjects ORDER BY updated_at DESC"
    } else {
        "SELECT * FROM subjects WHERE is_archived = 0 ORDER BY updated_at DESC"
    };
    let rows = sqlx::query_as::<_, SubjectRow>(sql).fetch_all(db).await?;
    rows.into_iter().map(SubjectRow::into_subject).collect()
}

pub async fn find_subject_by_id(db: &SqlitePool, id: &str) -> Result<Option<Subject>, AppError> {
    let row = sqlx::query_as::<_, SubjectRow>("SELECT * FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    row.map(SubjectRow::into_subject).transpose()
}

pub async fn insert_subject(db: &SqlitePool, req: NewSubjectRequest) -> Result<Subject, AppError> {
    let id = new_id();
    let ts = now();
    let curriculum_json = serde_json::to_string(&req.curriculum)?;

    sqlx::query(
        "INSERT INTO subjects
            (id, title, level, semester, year, curriculum, teacher_id,
            is_published, is_archived, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, NULL, 0, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.level)
    .bind(&req.semester)
    .bind(req.year)
    .bind(&curriculum_json)
    .bind(&ts)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Subject {
        id,
        title: req.title,
        level: req.level,
        semester: req.semester,
        year: req.year,
        curriculum: req.curriculum,
        teacher_id: None,
        is_published: false,
        is_archived: false,
        created_at: ts.clone(),
        updated_at: ts,
    })
}

pub async fn update_subject(
    db: &SqlitePool,
    id: &str,
    req: UpdateSubjectRequest,
) -> Result<Option<Subject>, AppError> {
    let mut current = match find_subject_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(level) = req.level {
        current.level = level;
    }
    if let Some(semester) = req.semester {
        current.semester = semester;
    }
    if let Some(year) = req.year {
        current.year = year;
    }
    if let Some(curriculum) = req.curriculum {
        current.curriculum = curriculum;
    }
    current.updated_at = now();

    let curriculum_json = serde_json::to_string(&current.curriculum)?;
    sqlx::query(
        "UPDATE subjects SET title = ?, level = ?, semester = ?, year = ?, curriculum = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&current.title)
    .bind(&current.level)
    .bind(&current.semester)
    .bind(current.year)
    .bind(&curriculum_json)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_subject(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn archive_subject(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_archived(db, id, true).await
}

pub async fn restore_subject(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    set_archived(db, id, false).await
}

async fn set_archived(db: &SqlitePool, id: &str, archived: bool) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE subjects SET is_archived = ?, updated_at = ? WHERE id = ?")
        .bind(archived)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn publish_subject(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE subjects SET is_published = 1, updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

pub async fn set_teacher(db: &SqlitePool, id: &str, teacher_id: Option<&str>) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE subjects SET teacher_id = ?, updated_at = ? WHERE id = ?")
        .bind(teacher_id)
        .bind(now())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

/// Replace the set of assigned students.
pub async fn set_students(db: &SqlitePool, subject_id: &str, student_ids: &[String]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM subject_students WHERE subject_id = ?")
        .bind(subject_id)
        .execute(db)
        .await?;
    for student_id in student_ids {
        sqlx::query("INSERT OR IGNORE INTO subject_students (subject_id, student_id) VALUES (?, ?)")
            .bind(subject_id)
            .bind(student_id)
            .execute(db)
            .await?;
    }
    Ok(())
}

pub async fn fetch_assigned_students(db: &SqlitePool, subject_id: &str) -> Result<Vec<Student>, AppError> {
    Ok(sqlx::query_as::<_, Student>(
        "SELECT st.* FROM students st
         JOIN subject_students ss ON ss.student_id = st.id
         WHERE ss.subject_id = ?
         ORDER BY st.last_name",
    )
    .bind(subject_id)
    .fetch_all(db)
    .await?)
}

pub async fn fetch_progress(db: &SqlitePool, subject_id: &str) -> Result<Vec<ProgressEntry>, AppError> {
    Ok(sqlx::query_as::<_, ProgressEntry>(
        "SELECT * FROM subject_progress WHERE subject_id = ?
         ORDER BY chapter_index, IFNULL(section_index, -1)",
    )
    .bind(subject_id)
    .fetch_all(db)
    .await?)
}

/// Append one completion record. The caller is responsible for the gating
/// check; this only persists.
pub async fn insert_progress(
    db: &SqlitePool,
    subject_id: &str,
    unit: UnitRef,
    title: &str,
) -> Result<ProgressEntry, AppError> {
    let id = new_id();
    let completed_date = now();

    sqlx::query(
        "INSERT INTO subject_progress (id, subject_id, chapter_index, section_index, title, completed_date)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(subject_id)
    .bind(unit.chapter as i64)
    .bind(unit.section.map(|s| s as i64))
    .bind(title)
    .bind(&completed_date)
    .execute(db)
    .await?;

    Ok(ProgressEntry {
        id,
        subject_id: subject_id.to_string(),
        chapter_index: unit.chapter as i64,
        section_index: unit.section.map(|s| s as i64),
        title: title.to_string(),
        completed_date,
    })
}

pub async fn fetch_evaluations(db: &SqlitePool, subject_id: &str) -> Result<Vec<Evaluation>, AppError> {
    Ok(sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluations WHERE subject_id = ? ORDER BY created_at DESC",
    )
    .bind(subject_id)
    .fetch_all(db)
    .await?)
}

pub async fn insert_evaluation(
    db: &SqlitePool,
    subject_id: &str,
    req: NewEvaluationRequest,
) -> Result<Evaluation, AppError> {
    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO evaluations (id, subject_id, score, feedback, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(subject_id)
    .bind(req.score)
    .bind(&req.feedback)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Evaluation {
        id,
        subject_id: subject_id.to_string(),
        score: req.score,
        feedback: req.feedback,
        created_at: ts,
    })
}

pub async fn fetch_propositions(db: &SqlitePool, subject_id: &str) -> Result<Vec<Proposition>, AppError> {
    Ok(sqlx::query_as::<_, Proposition>(
        "SELECT * FROM propositions WHERE subject_id = ? ORDER BY created_at DESC",
    )
    .bind(subject_id)
    .fetch_all(db)
    .await?)
}

pub async fn insert_proposition(
    db: &SqlitePool,
    subject_id: &str,
    teacher_id: Option<&str>,
    req: NewPropositionRequest,
) -> Result<Proposition, AppError> {
    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO propositions (id, subject_id, teacher_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(subject_id)
    .bind(teacher_id)
    .bind(&req.content)
    .bind(&ts)
    .execute(db)
    .await?;

    Ok(Proposition {
        id,
        subject_id: subject_id.to_string(),
        teacher_id: teacher_id.map(|t| t.to_string()),
        content: req.content,
        created_at: ts,
    })
}
