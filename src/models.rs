use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Applied,
    Interview,
    Offer,
    Accepted,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Accepted,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "applied",
            JobStatus::Interview => "interview",
            JobStatus::Offer => "offer",
            JobStatus::Accepted => "accepted",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(JobStatus::Applied),
            "interview" => Ok(JobStatus::Interview),
            "offer" => Ok(JobStatus::Offer),
            "accepted" => Ok(JobStatus::Accepted),
            "rejected" => Ok(JobStatus::Rejected),
            other => Err(anyhow!(
                "Unknown status '{}'. Available: applied, interview, offer, accepted, rejected",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryType {
    Positive,
    Negative,
    Neutral,
}

impl CategoryType {
    /// Parses a category type as the server sends it. Tolerates case and
    /// surrounding whitespace; anything unrecognized is None.
    pub fn parse(raw: &str) -> Option<CategoryType> {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Some(CategoryType::Positive),
            "negative" => Some(CategoryType::Negative),
            "neutral" => Some(CategoryType::Neutral),
            _ => None,
        }
    }
}

/// One tracked job application as the server returns it. Dates are kept as
/// the ISO strings the server sends; the client never does date math on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub job_title: String,
    pub company: String,
    #[serde(default)]
    pub role_category: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub general_notes: Option<String>,
    #[serde(default)]
    pub applied_date: Option<String>,
    #[serde(default)]
    pub interview_date: Option<String>,
    #[serde(default)]
    pub offer_date: Option<String>,
    #[serde(default)]
    pub accepted_date: Option<String>,
    #[serde(default)]
    pub rejected_date: Option<String>,
    // Nested on GET /jobs/{id}; never part of the job write payload.
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// The job fields actually transmitted on create/update. Nested feedback and
/// client-only fields are stripped before this is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub user_id: Option<i64>,
    pub job_title: String,
    pub company: String,
    pub role_category: Option<String>,
    pub status: JobStatus,
    pub general_notes: Option<String>,
    pub applied_date: Option<String>,
    pub interview_date: Option<String>,
    pub offer_date: Option<String>,
    pub accepted_date: Option<String>,
    pub rejected_date: Option<String>,
}

/// At most one feedback record per job on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Option<i64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub detailed_feedback: String,
    #[serde(default)]
    pub strengths: FeedbackSection,
    #[serde(default)]
    pub improvements: FeedbackSection,
}

/// Strengths or improvements: one headline item plus ordered extras. The
/// `additional` list is always serialized, even empty, so the server can
/// clear previously stored extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSection {
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub additional: Vec<String>,
}

impl FeedbackSection {
    pub fn is_empty(&self) -> bool {
        self.priority.trim().is_empty() && self.additional.iter().all(|s| s.trim().is_empty())
    }
}

/// The feedback fields transmitted on create/update. `notes` carries the
/// short summary, already truncated to 50 characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub notes: String,
    pub category_id: Option<i64>,
    pub detailed_feedback: String,
    pub strengths: FeedbackSection,
    pub improvements: FeedbackSection,
}

/// One interview question/answer pair. `id` is set when the question came
/// from the recommended bank, absent for free text. The whole set is
/// replaced on save; there is no per-entry diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQa {
    #[serde(default)]
    pub id: Option<i64>,
    pub question: String,
    pub answer: String,
}

/// Read-only reference data from the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedQuestion {
    pub id: i64,
    pub text: String,
}

/// Read-only reference data. The type stays a raw string because the filter
/// must tolerate malformed values without failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCategory {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub category_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub changed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}
