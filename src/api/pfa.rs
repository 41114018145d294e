use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::db::pfa as repo;
use crate::error::{AppError, codes};
use crate::listing::{ListQuery, Page, search_page};
use crate::models::{
    Choice, NewChoiceRequest, NewTopicRequest, PfaTopic, TopicDetail, TopicStatus, UpdateChoiceRequest,
    UpdateTopicRequest,
};
use crate::state::AppState;

#[derive(Deserialize)]
struct TopicListParams {
    search: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
    year: Option<i32>,
    status: Option<TopicStatus>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pfa", get(list_topics).post(create_topic))
        .route("/pfa/{id}", get(get_topic).patch(update_topic).delete(delete_topic))
        .route("/pfa/{id}/publish", patch(publish_topic))
        .route("/pfa/{id}/hide", patch(hide_topic))
        .route("/pfa/{id}/reject", patch(reject_topic))
        .route("/pfa/{id}/choices", post(create_choice))
        .route("/pfa/{id}/choices/{choice_id}", patch(update_choice))
}

async fn list_topics(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<TopicListParams>,
) -> Result<Json<Page<PfaTopic>>, AppError> {
    let topics = repo::fetch_topics(&state.db, params.year, params.status).await?;
    let query = ListQuery {
        search: params.search,
        page: params.page,
        per_page: params.per_page,
    };
    let page = search_page(topics, &query, |t| {
        vec![t.title.clone(), t.description.clone(), t.technologies.clone()]
    });
    Ok(Json(page))
}

async fn create_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewTopicRequest>,
) -> Result<Json<PfaTopic>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation(codes::INVALID_INPUT, "Topic title must not be empty"));
    }
    if let Some(teacher_id) = &req.teacher_id {
        crate::db::users::find_teacher_by_id(&state.db, teacher_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(codes::INVALID_INPUT, format!("Unknown teacher {}", teacher_id))
            })?;
    }

    let topic = repo::insert_topic(&state.db, req).await?;
    Ok(Json(topic))
}

async fn get_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<TopicDetail>, AppError> {
    let topic = repo::find_topic_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let students = repo::fetch_assigned_students(&state.db, &id).await?;
    let choices = repo::fetch_choices(&state.db, &id).await?;
    Ok(Json(TopicDetail {
        topic,
        students,
        choices,
    }))
}

async fn update_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateTopicRequest>,
) -> Result<Json<PfaTopic>, AppError> {
    let topic = repo::update_topic(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(topic))
}

async fn delete_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::delete_topic(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn publish_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    set_status(&state, &id, TopicStatus::Published).await
}

async fn hide_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    set_status(&state, &id, TopicStatus::Hidden).await
}

async fn reject_topic(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    set_status(&state, &id, TopicStatus::Rejected).await
}

async fn set_status(state: &AppState, id: &str, status: TopicStatus) -> Result<StatusCode, AppError> {
    if repo::set_topic_status(&state.db, id, status).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn create_choice(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<NewChoiceRequest>,
) -> Result<Json<Choice>, AppError> {
    repo::find_topic_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    crate::db::users::find_student_by_id(&state.db, &req.student_id)
        .await?
        .ok_or_else(|| {
            AppError::validation(codes::INVALID_INPUT, format!("Unknown student {}", req.student_id))
        })?;
    if req.priority < 1 {
        return Err(AppError::validation(codes::INVALID_INPUT, "Priority must be at least 1"));
    }

    let choice = repo::insert_choice(&state.db, &id, req).await?;
    Ok(Json(choice))
}

/// Teacher acceptance and admin validation share this endpoint. Validating
/// an accepted choice assigns the student to the topic, bounded by the
/// topic's mode capacity.
async fn update_choice(
    State(state): State<AppState>,
    _session: AuthSession,
    Path((id, choice_id)): Path<(String, String)>,
    Json(req): Json<UpdateChoiceRequest>,
) -> Result<Json<Choice>, AppError> {
    let topic = repo::find_topic_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let existing = repo::find_choice_by_id(&state.db, &choice_id)
        .await?
        .filter(|c| c.topic_id == id)
        .ok_or(AppError::NotFound)?;

    let will_assign = req.validated == Some(true)
        && !existing.validated
        && req.accepted_by_teacher.unwrap_or(existing.accepted_by_teacher);

    if will_assign {
        let assigned = repo::assigned_count(&state.db, &topic.id).await?;
        if assigned as usize >= topic.mode.capacity() {
            return Err(AppError::conflict(
                codes::CAPACITY,
                "This topic already has its full number of students",
            ));
        }
    }

    let choice = repo::update_choice(&state.db, &choice_id, req)
        .await?
        .ok_or(AppError::NotFound)?;

    if will_assign {
        repo::assign_student(&state.db, &topic.id, &choice.student_id).await?;
    }

    Ok(Json(choice))
}
