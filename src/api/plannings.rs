use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::db::plannings as repo;
use crate::error::{AppError, codes};
use crate::models::planning::parse_time_minutes;
use crate::models::{NewPlanningRequest, Planning, UpdatePlanningRequest};
use crate::state::AppState;

#[derive(Deserialize)]
struct PlanningListParams {
    #[serde(default)]
    published_only: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plannings", get(list_plannings).post(create_planning))
        .route(
            "/plannings/{id}",
            get(get_planning).patch(update_planning).delete(delete_planning),
        )
        .route("/plannings/{id}/publish", patch(publish_planning))
        .route("/plannings/publish", post(publish_all))
}

async fn list_plannings(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<PlanningListParams>,
) -> Result<Json<Vec<Planning>>, AppError> {
    let plannings = repo::fetch_plannings(&state.db, params.published_only).await?;
    Ok(Json(plannings))
}

async fn get_planning(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Planning>, AppError> {
    let planning = repo::find_planning_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(planning))
}

async fn create_planning(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewPlanningRequest>,
) -> Result<Json<Planning>, AppError> {
    validate_slot(
        &state,
        &req.topic_id,
        &req.time,
        req.duration_minutes,
        &req.encadrant_id,
        &req.rapporteur_id,
    )
    .await?;

    if repo::conflicting_slot_exists(&state.db, &req.date, &req.room, &req.time, req.duration_minutes, None)
        .await?
    {
        return Err(AppError::conflict(
            codes::ROOM_TAKEN,
            "Another defense already occupies this room at that time",
        ));
    }

    let planning = repo::insert_planning(&state.db, req).await?;
    Ok(Json(planning))
}

async fn update_planning(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlanningRequest>,
) -> Result<Json<Planning>, AppError> {
    let current = repo::find_planning_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let date = req.date.clone().unwrap_or_else(|| current.date.clone());
    let time = req.time.clone().unwrap_or_else(|| current.time.clone());
    let room = req.room.clone().unwrap_or_else(|| current.room.clone());
    let duration = req.duration_minutes.unwrap_or(current.duration_minutes);
    let encadrant = req.encadrant_id.clone().unwrap_or_else(|| current.encadrant_id.clone());
    let rapporteur = req
        .rapporteur_id
        .clone()
        .unwrap_or_else(|| current.rapporteur_id.clone());

    validate_slot(&state, &current.topic_id, &time, duration, &encadrant, &rapporteur).await?;

    if repo::conflicting_slot_exists(&state.db, &date, &room, &time, duration, Some(&id)).await? {
        return Err(AppError::conflict(
            codes::ROOM_TAKEN,
            "Another defense already occupies this room at that time",
        ));
    }

    let planning = repo::update_planning(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(planning))
}

async fn delete_planning(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::delete_planning(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn validate_slot(
    state: &AppState,
    topic_id: &str,
    time: &str,
    duration_minutes: i32,
    encadrant_id: &str,
    rapporteur_id: &str,
) -> Result<(), AppError> {
    if parse_time_minutes(time).is_none() {
        return Err(AppError::validation(codes::INVALID_INPUT, "Time must be HH:MM"));
    }
    if duration_minutes <= 0 {
        return Err(AppError::validation(codes::INVALID_INPUT, "Duration must be positive"));
    }
    if encadrant_id == rapporteur_id {
        return Err(AppError::validation(
            codes::SAME_TEACHER,
            "Encadrant and rapporteur must be different teachers",
        ));
    }

    crate::db::pfa::find_topic_by_id(&state.db, topic_id)
        .await?
        .ok_or_else(|| AppError::validation(codes::INVALID_INPUT, format!("Unknown topic {}", topic_id)))?;
    for teacher_id in [encadrant_id, rapporteur_id] {
        crate::db::users::find_teacher_by_id(&state.db, teacher_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(codes::INVALID_INPUT, format!("Unknown teacher {}", teacher_id))
            })?;
    }
    Ok(())
}

async fn publish_planning(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::publish_planning(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

#[derive(serde::Serialize)]
struct PublishAllResponse {
    published: u64,
}

async fn publish_all(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<PublishAllResponse>, AppError> {
    let published = repo::publish_all(&state.db).await?;
    Ok(Json(PublishAllResponse { published }))
}
