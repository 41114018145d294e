use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::Student;

/// Solo or pair project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Mode {
    Monome,
    Binome,
}

impl Mode {
    /// Maximum number of assigned students.
    pub fn capacity(self) -> usize {
        match self {
            Mode::Monome => 1,
            Mode::Binome => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TopicStatus {
    Pending,
    Published,
    Hidden,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PfaTopic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub mode: Mode,
    pub year: i32,
    pub teacher_id: Option<String>,
    pub status: TopicStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTopicRequest {
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub mode: Mode,
    pub year: i32,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTopicRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<String>,
    pub mode: Option<Mode>,
    pub year: Option<i32>,
}

/// A student's ranked interest in a topic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Choice {
    pub id: String,
    pub topic_id: String,
    pub student_id: String,
    pub priority: i32,
    pub accepted_by_teacher: bool,
    pub validated: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChoiceRequest {
    pub student_id: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateChoiceRequest {
    pub accepted_by_teacher: Option<bool>,
    pub validated: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDetail {
    #[serde(flatten)]
    pub topic: PfaTopic,
    pub students: Vec<Student>,
    pub choices: Vec<Choice>,
}
