pub mod periods;
pub mod pfa;
pub mod plannings;
pub mod skills;
pub mod subjects;
pub mod users;
pub mod years;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(users::routes())
        .merge(skills::routes())
        .merge(subjects::routes())
        .merge(periods::routes())
        .merge(years::routes())
        .merge(pfa::routes())
        .merge(plannings::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}
