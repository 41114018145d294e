use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::Router;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::db::skills as repo;
use crate::error::{AppError, codes};
use crate::listing::{ListQuery, Page, search_page};
use crate::models::{NewSkillRequest, Skill, SkillDetail, UpdateSkillRequest};
use crate::state::AppState;

#[derive(Deserialize)]
struct SkillListParams {
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
struct SetSubjectsRequest {
    subject_ids: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills).post(create_skill))
        .route("/skills/{id}", get(get_skill).put(update_skill).delete(delete_skill))
        .route("/skills/{id}/restore", patch(restore_skill))
        .route("/skills/{id}/subjects", put(set_subjects))
}

async fn list_skills(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<SkillListParams>,
) -> Result<Json<Page<Skill>>, AppError> {
    let skills = repo::fetch_skills(&state.db, params.include_archived).await?;
    let query = ListQuery {
        search: params.search,
        page: params.page,
        per_page: params.per_page,
    };
    let page = search_page(skills, &query, |s| {
        let mut fields = vec![s.name.clone()];
        if let Some(description) = &s.description {
            fields.push(description.clone());
        }
        fields
    });
    Ok(Json(page))
}

async fn create_skill(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(req): Json<NewSkillRequest>,
) -> Result<Json<Skill>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation(codes::INVALID_INPUT, "Skill name must not be empty"));
    }
    let skill = repo::insert_skill(&state.db, req).await?;
    Ok(Json(skill))
}

async fn get_skill(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<SkillDetail>, AppError> {
    let skill = repo::find_skill_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let subjects = repo::fetch_subject_refs(&state.db, &id).await?;
    Ok(Json(SkillDetail { skill, subjects }))
}

async fn update_skill(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateSkillRequest>,
) -> Result<Json<Skill>, AppError> {
    let current = repo::find_skill_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let name_unchanged = req.name.as_ref().is_none_or(|n| *n == current.name);
    let description_unchanged = req
        .description
        .as_ref()
        .is_none_or(|d| Some(d) == current.description.as_ref());
    if name_unchanged && description_unchanged {
        return Err(AppError::conflict(codes::NO_CHANGES, "No changes detected"));
    }

    let skill = repo::update_skill(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(skill))
}

async fn delete_skill(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    repo::find_skill_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if repo::linked_subject_count(&state.db, &id).await? > 0 {
        if !params.archive {
            return Err(AppError::conflict(
                codes::LINKED,
                "Skill is linked to subjects; archive instead",
            ));
        }
        repo::archive_skill(&state.db, &id).await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    repo::delete_skill(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_skill(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repo::restore_skill(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn set_subjects(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<SetSubjectsRequest>,
) -> Result<Json<SkillDetail>, AppError> {
    let skill = repo::find_skill_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    for subject_id in &req.subject_ids {
        crate::db::subjects::find_subject_by_id(&state.db, subject_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(codes::INVALID_INPUT, format!("Unknown subject {}", subject_id))
            })?;
    }

    repo::set_subjects(&state.db, &id, &req.subject_ids).await?;
    let subjects = repo::fetch_subject_refs(&state.db, &id).await?;
    Ok(Json(SkillDetail { skill, subjects }))
}
