use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    FeedbackCategory, FeedbackPayload, InterviewQa, JobApplication, JobPayload,
    RecommendedQuestion, StatusHistoryEntry, User,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 from any endpoint. Kept distinct so the caller can clear the
    /// stored credential and ask the user to log in again.
    #[error("not authorized (credential missing, expired, or invalid)")]
    Unauthorized,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("create response did not include the new job id")]
    MissingJobId,
}

/// The write operations the save workflow performs, behind a trait so the
/// orchestrator can be exercised against a recording fake.
#[async_trait]
pub trait JobStore {
    async fn create_job(&self, payload: &JobPayload) -> Result<i64, ApiError>;
    async fn update_job(&self, job_id: i64, payload: &JobPayload) -> Result<(), ApiError>;
    async fn create_feedback(&self, job_id: i64, payload: &FeedbackPayload) -> Result<(), ApiError>;
    async fn update_feedback(&self, job_id: i64, payload: &FeedbackPayload) -> Result<(), ApiError>;
    async fn delete_feedback(&self, job_id: i64) -> Result<(), ApiError>;
    async fn replace_interview_qas(&self, job_id: i64, qas: &[InterviewQa])
        -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

// POST /jobs wraps the record: {"message": ..., "job": {...}}
#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job: JobApplication,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("request failed with {}: {}", status, body);
            return Err(parse_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    // --- Identity collaborator ---

    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let response = self
            .request(Method::POST, "/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: LoginResponse = Self::check(response).await?.json().await?;
        Ok(body.token)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let response = self.request(Method::GET, "/auth/current-user").send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // --- Job records ---

    pub async fn list_jobs(&self) -> Result<Vec<JobApplication>, ApiError> {
        let response = self.request(Method::GET, "/jobs").send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_job(&self, job_id: i64) -> Result<JobApplication, ApiError> {
        let response = self
            .request(Method::GET, &format!("/jobs/{}", job_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_job(&self, job_id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/jobs/{}", job_id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // --- Reference data ---

    pub async fn feedback_categories(&self) -> Result<Vec<FeedbackCategory>, ApiError> {
        let response = self
            .request(Method::GET, "/jobs/feedback-categories")
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Recommended questions, scoped to a job when an id is given, otherwise
    /// the global bank.
    pub async fn recommended_questions(
        &self,
        job_id: Option<i64>,
    ) -> Result<Vec<RecommendedQuestion>, ApiError> {
        let path = match job_id {
            Some(id) => format!("/jobs/{}/recommended-questions", id),
            None => "/jobs/recommended-questions".to_string(),
        };
        let response = self.request(Method::GET, &path).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // --- Sub-resources ---

    pub async fn interview_qas(&self, job_id: i64) -> Result<Vec<InterviewQa>, ApiError> {
        let response = self
            .request(Method::GET, &format!("/jobs/{}/interview-questions", job_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn status_history(&self, job_id: i64) -> Result<Vec<StatusHistoryEntry>, ApiError> {
        let response = self
            .request(Method::GET, &format!("/jobs/{}/status-history", job_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[async_trait]
impl JobStore for ApiClient {
    async fn create_job(&self, payload: &JobPayload) -> Result<i64, ApiError> {
        let response = self.request(Method::POST, "/jobs").json(payload).send().await?;
        let body: CreateJobResponse = Self::check(response).await?.json().await?;
        body.job.id.ok_or(ApiError::MissingJobId)
    }

    async fn update_job(&self, job_id: i64, payload: &JobPayload) -> Result<(), ApiError> {
        let response = self
            .request(Method::PUT, &format!("/jobs/{}", job_id))
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_feedback(
        &self,
        job_id: i64,
        payload: &FeedbackPayload,
    ) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &format!("/jobs/{}/feedback", job_id))
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_feedback(
        &self,
        job_id: i64,
        payload: &FeedbackPayload,
    ) -> Result<(), ApiError> {
        let response = self
            .request(Method::PUT, &format!("/jobs/{}/feedback", job_id))
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_feedback(&self, job_id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/jobs/{}/feedback", job_id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn replace_interview_qas(
        &self,
        job_id: i64,
        qas: &[InterviewQa],
    ) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &format!("/jobs/{}/interview-questions", job_id))
            .json(&qas)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Pulls a human-readable message out of an error body. The server sends
/// either {"message": ...} or {"error": ...}; anything else is passed through
/// raw.
fn parse_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.to_string());
    ApiError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_field() {
        let err = parse_error(400, r#"{"message": "Missing required fields"}"#);
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Missing required fields");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_error_field() {
        let err = parse_error(500, r#"{"error": "boom"}"#);
        assert_eq!(err.to_string(), "server returned 500: boom");
    }

    #[test]
    fn test_parse_error_plain_body() {
        let err = parse_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "server returned 502: Bad Gateway");
    }

    #[test]
    fn test_base_url_trailing_slash_ignored() {
        let client = ApiClient::new("http://localhost:5000/", None);
        assert_eq!(client.url("/jobs"), "http://localhost:5000/api/jobs");
    }
}
