use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Chapter/section outline attached to a subject. Stored as a JSON text
/// column; the tree is small and read whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub title: String,
    pub level: String,
    pub semester: String,
    pub year: i32,
    pub curriculum: Curriculum,
    pub teacher_id: Option<String>,
    pub is_published: bool,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Minimal reference used where a full subject is not needed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubjectRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubjectRequest {
    pub title: String,
    pub level: String,
    pub semester: String,
    pub year: i32,
    #[serde(default)]
    pub curriculum: Curriculum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSubjectRequest {
    pub title: Option<String>,
    pub level: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub curriculum: Option<Curriculum>,
}

/// One completed curriculum unit. Keyed by indices; the display title keeps
/// the legacy `"Chapter"` / `"Chapter - Section"` form for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressEntry {
    pub id: String,
    pub subject_id: String,
    pub chapter_index: i64,
    pub section_index: Option<i64>,
    pub title: String,
    pub completed_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub percent: u8,
    pub entries: Vec<ProgressEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: String,
    pub subject_id: String,
    pub score: f64,
    pub feedback: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvaluationRequest {
    pub score: f64,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Proposition {
    pub id: String,
    pub subject_id: String,
    pub teacher_id: Option<String>,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropositionRequest {
    pub content: String,
}
