use std::collections::HashSet;

use crate::api::{ApiClient, ApiError};
use crate::models::RecommendedQuestion;

/// One-shot fetch of the candidate question bank: scoped to a job when an id
/// is given, otherwise the global bank.
pub async fn fetch_candidates(
    client: &ApiClient,
    job_id: Option<i64>,
) -> Result<Vec<RecommendedQuestion>, ApiError> {
    client.recommended_questions(job_id).await
}

/// Filters the bank against what the user typed. A candidate shows up iff it
/// is not in the exclusion set and its text contains the query,
/// case-insensitively. A blank query suggests nothing.
pub fn filter_candidates<'a>(
    bank: &'a [RecommendedQuestion],
    used_ids: &HashSet<i64>,
    query: &str,
) -> Vec<&'a RecommendedQuestion> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    bank.iter()
        .filter(|q| !used_ids.contains(&q.id) && q.text.to_lowercase().contains(&query))
        .collect()
}
