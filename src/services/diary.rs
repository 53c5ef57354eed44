//! AveDiary homework API client.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

const AVEDIARY_API_BASE: &str = "https://avediary.online/api.php";

/// Errors surfaced by the diary API.
#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Diary API returned error status code {0}")]
    UpstreamStatus(u16),

    #[error("Failed to decode diary API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DiaryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Capability contract for the remote school-diary API.
#[async_trait]
pub trait DiaryApi: Send + Sync {
    /// Whether a class with this login is registered in the diary.
    async fn class_login_exists(&self, class_login: &str) -> Result<bool, DiaryError>;

    /// Raw homework text for tomorrow.
    async fn tomorrow_homework(&self, class_login: &str) -> Result<String, DiaryError>;

    /// Raw homework text for the whole diary.
    async fn all_homework(&self, class_login: &str) -> Result<String, DiaryError>;
}

#[derive(Debug, Deserialize)]
struct LoginExistsResponse {
    result: bool,
}

#[derive(Debug, Deserialize)]
struct HomeworkResponse {
    /// Homework body; line breaks arrive as literal `\n` escapes.
    #[serde(rename = "dz", default)]
    homework: String,
    #[serde(rename = "server_date", default)]
    _server_date: Option<String>,
    #[serde(rename = "server_time", default)]
    _server_time: Option<String>,
}

/// HTTP client for the AveDiary API.
#[derive(Clone)]
pub struct DiaryClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for DiaryClient {
    fn default() -> Self {
        Self::new(AVEDIARY_API_BASE)
    }
}

impl DiaryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    async fn get_homework(
        &self,
        class_login: &str,
        date: &str,
    ) -> Result<String, DiaryError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("login", class_login), ("type", "json"), ("date", date)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DiaryError::UpstreamStatus(response.status().as_u16()));
        }

        let body: HomeworkResponse = response
            .json()
            .await
            .map_err(|e| DiaryError::Decode(e.to_string()))?;
        Ok(body.homework)
    }
}

#[async_trait]
impl DiaryApi for DiaryClient {
    async fn class_login_exists(&self, class_login: &str) -> Result<bool, DiaryError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("type", "test"), ("login", class_login)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DiaryError::UpstreamStatus(response.status().as_u16()));
        }

        let body: LoginExistsResponse = response
            .json()
            .await
            .map_err(|e| DiaryError::Decode(e.to_string()))?;
        Ok(body.result)
    }

    async fn tomorrow_homework(&self, class_login: &str) -> Result<String, DiaryError> {
        self.get_homework(class_login, "tomorrow").await
    }

    async fn all_homework(&self, class_login: &str) -> Result<String, DiaryError> {
        self.get_homework(class_login, "all").await
    }
}
