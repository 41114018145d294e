use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;

use crate::auth::AuthSession;
use crate::db::periods as repo;
use crate::error::{AppError, codes};
use crate::models::{NewPeriodRequest, PeriodWithStatus, UpdatePeriodRequest};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/period", get(list_periods).post(create_period))
        .route("/period/{id}", put(update_period).delete(delete_period))
}

async fn list_periods(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<Vec<PeriodWithStatus>>, AppError> {
    let now = Utc::now();
    let periods = repo::fetch_periods(&state.db)
        .await?
        .into_iter()
        .map(|p| p.with_status(now))
        .collect();
    Ok(Json(periods))
}

async fn create_period(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewPeriodRequest>,
) -> Result<Json<PeriodWithStatus>, AppError> {
    if req.start_date > req.end_date {
        return Err(AppError::validation(
            codes::INVALID_RANGE,
            "Start date must not be after end date",
        ));
    }
    if repo::overlapping_exists(&state.db, req.period_type, req.start_date, req.end_date, None).await? {
        return Err(AppError::conflict(
            codes::OVERLAP,
            "A period of this type already covers part of this range",
        ));
    }

    let period = repo::insert_period(&state.db, req).await?;
    Ok(Json(period.with_status(Utc::now())))
}

async fn update_period(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdatePeriodRequest>,
) -> Result<Json<PeriodWithStatus>, AppError> {
    let current = repo::find_period_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let start = req.start_date.unwrap_or(current.start_date);
    let end = req.end_date.unwrap_or(current.end_date);
    if start > end {
        return Err(AppError::validation(
            codes::INVALID_RANGE,
            "Start date must not be after end date",
        ));
    }
    if repo::overlapping_exists(&state.db, current.period_type, start, end, Some(&id)).await? {
        return Err(AppError::conflict(
            codes::OVERLAP,
            "A period of this type already covers part of this range",
        ));
    }

    let period = repo::update_period(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(period.with_status(Utc::now())))
}

async fn delete_period(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::delete_period(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
