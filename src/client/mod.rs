//! Typed HTTP client for the PFA backend API.
//!
//! One bearer token, one base URL, one call per method; failures are
//! normalized into [`ClientError`] with the server's `message`/`error`
//! field when one is present. No retries, no batching.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::listing::Page;
use crate::models::{
    NewPeriodRequest, NewYearRequest, PeriodWithStatus, PfaTopic, Planning, ProgressEntry, Skill,
    Student, Subject, Teacher, Year,
};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    pub fn new_from_env() -> Result<Self, ClientError> {
        let base_url = env::var("PFA_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        let token = env::var("PFA_API_TOKEN")
            .map_err(|_| ClientError::Network("PFA_API_TOKEN is not set".to_string()))?;
        Ok(Self { base_url, token })
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bad request: {message}")]
    BadRequest { code: Option<String>, message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { code: Option<String>, message: String },

    #[error("server error: {message}")]
    Server { message: String },

    #[error("unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

const GENERIC_ERROR: &str = "Unexpected server error";

/// Map a non-success response to a [`ClientError`], pulling the message
/// out of the body when the server sent one.
fn normalize_error(status: u16, body: &str) -> ClientError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(body) => (
            body.code,
            body.message.or(body.error).unwrap_or_else(|| GENERIC_ERROR.to_string()),
        ),
        None => (None, GENERIC_ERROR.to_string()),
    };

    match status {
        400 => ClientError::BadRequest { code, message },
        401 => ClientError::Unauthorized { message },
        403 => ClientError::Forbidden { message },
        404 => ClientError::NotFound { message },
        409 => ClientError::Conflict { code, message },
        500..=599 => ClientError::Server { message },
        _ => ClientError::Unexpected { status, message },
    }
}

#[async_trait]
pub trait PfaApi: Send + Sync {
    async fn fetch_students(&self, search: Option<&str>) -> Result<Page<Student>, ClientError>;
    async fn fetch_teachers(&self, search: Option<&str>) -> Result<Page<Teacher>, ClientError>;
    async fn fetch_subjects(&self, search: Option<&str>) -> Result<Page<Subject>, ClientError>;
    async fn fetch_skills(&self, search: Option<&str>) -> Result<Page<Skill>, ClientError>;
    async fn fetch_periods(&self) -> Result<Vec<PeriodWithStatus>, ClientError>;
    async fn create_period(&self, req: &NewPeriodRequest) -> Result<PeriodWithStatus, ClientError>;
    async fn fetch_topics(&self, search: Option<&str>) -> Result<Page<PfaTopic>, ClientError>;
    async fn fetch_plannings(&self) -> Result<Vec<Planning>, ClientError>;
    async fn create_year(&self, req: &NewYearRequest) -> Result<Year, ClientError>;
    async fn mark_complete(
        &self,
        subject_id: &str,
        chapter_index: usize,
        section_index: Option<usize>,
    ) -> Result<ProgressEntry, ClientError>;
}

pub struct HttpPfaClient {
    client: Client,
    config: ClientConfig,
}

impl HttpPfaClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .header("Authorization", format!("Bearer {}", self.config.token))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", self.config.token))
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(normalize_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn search_query(search: Option<&str>) -> Vec<(&str, &str)> {
        match search {
            Some(term) => vec![("search", term)],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl PfaApi for HttpPfaClient {
    async fn fetch_students(&self, search: Option<&str>) -> Result<Page<Student>, ClientError> {
        self.get_json("/students", &Self::search_query(search)).await
    }

    async fn fetch_teachers(&self, search: Option<&str>) -> Result<Page<Teacher>, ClientError> {
        self.get_json("/teachers", &Self::search_query(search)).await
    }

    async fn fetch_subjects(&self, search: Option<&str>) -> Result<Page<Subject>, ClientError> {
        self.get_json("/subjects", &Self::search_query(search)).await
    }

    async fn fetch_skills(&self, search: Option<&str>) -> Result<Page<Skill>, ClientError> {
        self.get_json("/skills", &Self::search_query(search)).await
    }

    async fn fetch_periods(&self) -> Result<Vec<PeriodWithStatus>, ClientError> {
        self.get_json("/period", &[]).await
    }

    async fn create_period(&self, req: &NewPeriodRequest) -> Result<PeriodWithStatus, ClientError> {
        self.post_json("/period", req).await
    }

    async fn fetch_topics(&self, search: Option<&str>) -> Result<Page<PfaTopic>, ClientError> {
        self.get_json("/pfa", &Self::search_query(search)).await
    }

    async fn fetch_plannings(&self) -> Result<Vec<Planning>, ClientError> {
        self.get_json("/plannings", &[]).await
    }

    async fn create_year(&self, req: &NewYearRequest) -> Result<Year, ClientError> {
        self.post_json("/years", req).await
    }

    async fn mark_complete(
        &self,
        subject_id: &str,
        chapter_index: usize,
        section_index: Option<usize>,
    ) -> Result<ProgressEntry, ClientError> {
        let body = json!({
            "chapter_index": chapter_index,
            "section_index": section_index,
        });
        self.post_json(&format!("/subjects/{}/progress", subject_id), &body)
            .await
    }
}

/// Inert client for wiring and tests.
pub struct NoopPfaClient;

fn empty_page<T>() -> Page<T> {
    Page {
        items: Vec::new(),
        page: 1,
        per_page: crate::listing::DEFAULT_PER_PAGE,
        total_items: 0,
        total_pages: 0,
    }
}

#[async_trait]
impl PfaApi for NoopPfaClient {
    async fn fetch_students(&self, _search: Option<&str>) -> Result<Page<Student>, ClientError> {
        Ok(empty_page())
    }

    async fn fetch_teachers(&self, _search: Option<&str>) -> Result<Page<Teacher>, ClientError> {
        Ok(empty_page())
    }

    async fn fetch_subjects(&self, _search: Option<&str>) -> Result<Page<Subject>, ClientError> {
        Ok(empty_page())
    }

    async fn fetch_skills(&self, _search: Option<&str>) -> Result<Page<Skill>, ClientError> {
        Ok(empty_page())
    }

    async fn fetch_periods(&self) -> Result<Vec<PeriodWithStatus>, ClientError> {
        Ok(Vec::new())
    }

    async fn create_period(&self, _req: &NewPeriodRequest) -> Result<PeriodWithStatus, ClientError> {
        Err(ClientError::Network("noop client".to_string()))
    }

    async fn fetch_topics(&self, _search: Option<&str>) -> Result<Page<PfaTopic>, ClientError> {
        Ok(empty_page())
    }

    async fn fetch_plannings(&self) -> Result<Vec<Planning>, ClientError> {
        Ok(Vec::new())
    }

    async fn create_year(&self, _req: &NewYearRequest) -> Result<Year, ClientError> {
        Err(ClientError::Network("noop client".to_string()))
    }

    async fn mark_complete(
        &self,
        _subject_id: &str,
        _chapter_index: usize,
        _section_index: Option<usize>,
    ) -> Result<ProgressEntry, ClientError> {
        Err(ClientError::Network("noop client".to_string()))
    }
}
