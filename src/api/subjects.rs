use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AuthSession;
use crate::db::subjects as repo;
use crate::error::{AppError, codes};
use crate::listing::{ListQuery, Page, search_page};
use crate::models::{
    Evaluation, NewEvaluationRequest, NewPropositionRequest, NewSubjectRequest, ProgressEntry,
    ProgressReport, Proposition, Student, Subject, UpdateSubjectRequest,
};
use crate::progress::{self, CompletionError, UnitRef};
use crate::state::AppState;

#[derive(Deserialize)]
struct SubjectListParams {
    search: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
    #[serde(default)]
    include_archived: bool,
}

#[derive(Deserialize)]
struct DeleteParams {
    #[serde(default)]
    archive: bool,
}

#[derive(Deserialize)]
struct SetTeacherRequest {
    teacher_id: Option<String>,
}

#[derive(Deserialize)]
struct SetStudentsRequest {
    student_ids: Vec<String>,
}

#[derive(Deserialize)]
struct MarkCompleteRequest {
    chapter_index: usize,
    section_index: Option<usize>,
}

#[derive(Serialize)]
struct SubjectDetail {
    #[serde(flatten)]
    subject: Subject,
    students: Vec<Student>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list_subjects).post(create_subject))
        .route(
            "/subjects/{id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
        .route("/subjects/{id}/restore", patch(restore_subject))
        .route("/subjects/{id}/publish", patch(publish_subject))
        .route("/subjects/{id}/teacher", put(set_teacher))
        .route("/subjects/{id}/students", put(set_students))
        .route("/subjects/{id}/progress", get(get_progress).post(mark_complete))
        .route(
            "/subjects/{id}/evaluations",
            get(list_evaluations).post(create_evaluation),
        )
        .route(
            "/subjects/{id}/propositions",
            get(list_propositions).post(create_proposition),
        )
}

async fn list_subjects(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<SubjectListParams>,
) -> Result<Json<Page<Subject>>, AppError> {
    let subjects = repo::fetch_subjects(&state.db, params.include_archived).await?;
    let query = ListQuery {
        search: params.search,
        page: params.page,
        per_page: params.per_page,
    };
    let page = search_page(subjects, &query, |s| {
        vec![s.title.clone(), s.level.clone(), s.semester.clone(), s.year.to_string()]
    });
    Ok(Json(page))
}

async fn create_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation(codes::INVALID_INPUT, "Subject title must not be empty"));
    }
    let subject = repo::insert_subject(&state.db, req).await?;
    Ok(Json(subject))
}

async fn get_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<SubjectDetail>, AppError> {
    let subject = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let students = repo::fetch_assigned_students(&state.db, &id).await?;
    Ok(Json(SubjectDetail { subject, students }))
}

async fn update_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    let current = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let unchanged = req.title.as_ref().is_none_or(|v| *v == current.title)
        && req.level.as_ref().is_none_or(|v| *v == current.level)
        && req.semester.as_ref().is_none_or(|v| *v == current.semester)
        && req.year.is_none_or(|v| v == current.year)
        && req.curriculum.as_ref().is_none_or(|v| *v == current.curriculum);
    if unchanged {
        return Err(AppError::conflict(codes::NO_CHANGES, "No changes detected"));
    }

    let subject = repo::update_subject(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subject))
}

async fn delete_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    let subject = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if subject.teacher_id.is_some() {
        if !params.archive {
            return Err(AppError::conflict(
                codes::LINKED,
                "Subject is assigned to a teacher; archive instead",
            ));
        }
        repo::archive_subject(&state.db, &id).await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    repo::delete_subject(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::restore_subject(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn publish_subject(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::publish_subject(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn set_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<SetTeacherRequest>,
) -> Result<StatusCode, AppError> {
    if let Some(teacher_id) = &req.teacher_id {
        crate::db::users::find_teacher_by_id(&state.db, teacher_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(codes::INVALID_INPUT, format!("Unknown teacher {}", teacher_id))
            })?;
    }

    if repo::set_teacher(&state.db, &id, req.teacher_id.as_deref()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn set_students(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<SetStudentsRequest>,
) -> Result<Json<Vec<Student>>, AppError> {
    repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    for student_id in &req.student_ids {
        crate::db::users::find_student_by_id(&state.db, student_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(codes::INVALID_INPUT, format!("Unknown student {}", student_id))
            })?;
    }

    repo::set_students(&state.db, &id, &req.student_ids).await?;
    let students = repo::fetch_assigned_students(&state.db, &id).await?;
    Ok(Json(students))
}

async fn get_progress(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<ProgressReport>, AppError> {
    let subject = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let entries = repo::fetch_progress(&state.db, &id).await?;
    let done: Vec<UnitRef> = entries.iter().map(entry_unit).collect();
    let percent = progress::percent(&subject.curriculum, &done);
    Ok(Json(ProgressReport { percent, entries }))
}

async fn mark_complete(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<MarkCompleteRequest>,
) -> Result<Json<ProgressEntry>, AppError> {
    let subject = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let unit = UnitRef {
        chapter: req.chapter_index,
        section: req.section_index,
    };
    let entries = repo::fetch_progress(&state.db, &id).await?;
    let done: Vec<UnitRef> = entries.iter().map(entry_unit).collect();

    progress::can_complete(&subject.curriculum, &done, unit).map_err(|e| match e {
        CompletionError::OutOfRange => AppError::NotFound,
        CompletionError::AlreadyCompleted => {
            AppError::conflict(codes::ALREADY_COMPLETED, "This item is already completed")
        }
        CompletionError::Locked => AppError::conflict(
            codes::PROGRESS_LOCKED,
            "Previous chapters and sections must be completed first",
        ),
    })?;

    let title = progress::display_title(&subject.curriculum, unit).ok_or(AppError::NotFound)?;
    let entry = repo::insert_progress(&state.db, &id, unit, &title).await?;
    Ok(Json(entry))
}

fn entry_unit(entry: &ProgressEntry) -> UnitRef {
    UnitRef {
        chapter: entry.chapter_index as usize,
        section: entry.section_index.map(|s| s as usize),
    }
}

async fn list_evaluations(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let evaluations = repo::fetch_evaluations(&state.db, &id).await?;
    Ok(Json(evaluations))
}

async fn create_evaluation(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<NewEvaluationRequest>,
) -> Result<Json<Evaluation>, AppError> {
    repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !(0.0..=20.0).contains(&req.score) {
        return Err(AppError::validation(
            codes::INVALID_INPUT,
            "Score must be between 0 and 20",
        ));
    }

    let evaluation = repo::insert_evaluation(&state.db, &id, req).await?;
    Ok(Json(evaluation))
}

async fn list_propositions(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Vec<Proposition>>, AppError> {
    repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let propositions = repo::fetch_propositions(&state.db, &id).await?;
    Ok(Json(propositions))
}

async fn create_proposition(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<NewPropositionRequest>,
) -> Result<Json<Proposition>, AppError> {
    let subject = repo::find_subject_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if req.content.trim().is_empty() {
        return Err(AppError::validation(
            codes::INVALID_INPUT,
            "Proposition content must not be empty",
        ));
    }

    let proposition =
        repo::insert_proposition(&state.db, &id, subject.teacher_id.as_deref(), req).await?;
    Ok(Json(proposition))
}
