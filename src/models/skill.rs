use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::subject::SubjectRef;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSkillRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub subject_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSkillRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A skill together with the subjects it is linked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDetail {
    #[serde(flatten)]
    pub skill: Skill,
    pub subjects: Vec<SubjectRef>,
}
