use axum::Json;
use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthSession;
use crate::db::years as repo;
use crate::error::{AppError, codes};
use crate::events::AppEvent;
use crate::models::{NewYearRequest, Year};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/years", get(list_years).post(create_year))
}

async fn list_years(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<Vec<Year>>, AppError> {
    let years = repo::fetch_years(&state.db).await?;
    Ok(Json(years))
}

async fn create_year(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewYearRequest>,
) -> Result<Json<Year>, AppError> {
    if req.label.trim().is_empty() {
        return Err(AppError::validation(codes::INVALID_INPUT, "Year label must not be empty"));
    }

    let year = repo::insert_year(&state.db, req).await?;
    state.events.publish(AppEvent::YearCreated {
        label: year.label.clone(),
    });
    Ok(Json(year))
}
