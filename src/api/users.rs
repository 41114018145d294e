use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::db::users as repo;
use crate::error::{AppError, codes};
use crate::listing::{ListQuery, Page, search_page};
use crate::models::{
    NewStudentRequest, NewTeacherRequest, Student, Teacher, UpdateStudentRequest, UpdateTeacherRequest,
};
use crate::state::AppState;

#[derive(Deserialize)]
struct UserListParams {
    search: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
    #[serde(default)]
    include_archived: bool,
}

impl UserListParams {
    fn list_query(&self) -> ListQuery {
        ListQuery {
            search: self.search.clone(),
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Deserialize)]
struct DeleteParams {
    #[serde(default)]
    archive: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/students/{id}/restore", patch(restore_student))
        .route("/teachers", get(list_teachers).post(create_teacher))
        .route(
            "/teachers/{id}",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
        .route("/teachers/{id}/restore", patch(restore_teacher))
}

async fn list_students(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<UserListParams>,
) -> Result<Json<Page<Student>>, AppError> {
    let students = repo::fetch_students(&state.db, params.include_archived).await?;
    let page = search_page(students, &params.list_query(), |s| {
        vec![s.first_name.clone(), s.last_name.clone(), s.email.clone(), s.level.clone()]
    });
    Ok(Json(page))
}

async fn create_student(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewStudentRequest>,
) -> Result<Json<Student>, AppError> {
    let student = repo::insert_student(&state.db, req).await?;
    Ok(Json(student))
}

async fn get_student(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let student = repo::find_student_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(student))
}

async fn update_student(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateStudentRequest>,
) -> Result<Json<Student>, AppError> {
    let student = repo::update_student(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(student))
}

async fn delete_student(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    repo::find_student_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if repo::student_link_count(&state.db, &id).await? > 0 {
        if !params.archive {
            return Err(AppError::conflict(
                codes::LINKED,
                "Student is referenced by subjects or topics; archive instead",
            ));
        }
        repo::archive_student(&state.db, &id).await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    repo::delete_student(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_student(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::restore_student(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_teachers(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<UserListParams>,
) -> Result<Json<Page<Teacher>>, AppError> {
    let teachers = repo::fetch_teachers(&state.db, params.include_archived).await?;
    let page = search_page(teachers, &params.list_query(), |t| {
        let mut fields = vec![t.first_name.clone(), t.last_name.clone(), t.email.clone()];
        if let Some(grade) = &t.grade {
            fields.push(grade.clone());
        }
        fields
    });
    Ok(Json(page))
}

async fn create_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = repo::insert_teacher(&state.db, req).await?;
    Ok(Json(teacher))
}

async fn get_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = repo::find_teacher_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(teacher))
}

async fn update_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = repo::update_teacher(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(teacher))
}

async fn delete_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    repo::find_teacher_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if repo::teacher_link_count(&state.db, &id).await? > 0 {
        if !params.archive {
            return Err(AppError::conflict(
                codes::LINKED,
                "Teacher is referenced by subjects, topics or plannings; archive instead",
            ));
        }
        repo::archive_teacher(&state.db, &id).await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    repo::delete_teacher(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_teacher(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::restore_teacher(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
