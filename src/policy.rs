use crate::models::{CategoryType, FeedbackCategory, JobStatus};

/// Which feedback-category types make sense for a status. Offers and
/// acceptances take positive/neutral feedback, rejections negative/neutral,
/// everything earlier in the pipeline takes all three.
pub fn allowed_category_types(status: JobStatus) -> &'static [CategoryType] {
    match status {
        JobStatus::Offer | JobStatus::Accepted => &[CategoryType::Positive, CategoryType::Neutral],
        JobStatus::Rejected => &[CategoryType::Negative, CategoryType::Neutral],
        JobStatus::Applied | JobStatus::Interview => &[
            CategoryType::Positive,
            CategoryType::Negative,
            CategoryType::Neutral,
        ],
    }
}

/// Filters the selectable categories for a status. Comparison is trimmed and
/// case-insensitive; categories with a malformed type are dropped rather
/// than failing, so a bad reference list degrades to an empty menu.
pub fn filter_categories(
    categories: &[FeedbackCategory],
    status: JobStatus,
) -> Vec<FeedbackCategory> {
    let allowed = allowed_category_types(status);
    categories
        .iter()
        .filter(|cat| {
            CategoryType::parse(&cat.category_type)
                .map(|t| allowed.contains(&t))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i64, name: &str, category_type: &str) -> FeedbackCategory {
        FeedbackCategory {
            id,
            name: name.to_string(),
            category_type: category_type.to_string(),
        }
    }

    #[test]
    fn test_allowed_types_per_status() {
        for status in [JobStatus::Offer, JobStatus::Accepted] {
            assert_eq!(
                allowed_category_types(status),
                &[CategoryType::Positive, CategoryType::Neutral]
            );
        }
        assert_eq!(
            allowed_category_types(JobStatus::Rejected),
            &[CategoryType::Negative, CategoryType::Neutral]
        );
        for status in [JobStatus::Applied, JobStatus::Interview] {
            assert_eq!(allowed_category_types(status).len(), 3);
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_and_trimmed() {
        let cats = vec![
            cat(1, "Strong skills", " Positive "),
            cat(2, "Culture mismatch", "NEGATIVE"),
            cat(3, "General", "neutral"),
        ];

        let filtered = filter_categories(&cats, JobStatus::Offer);
        let ids: Vec<i64> = filtered.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let filtered = filter_categories(&cats, JobStatus::Rejected);
        let ids: Vec<i64> = filtered.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_tolerates_empty_and_malformed_lists() {
        assert!(filter_categories(&[], JobStatus::Applied).is_empty());

        let junk = vec![cat(1, "???", ""), cat(2, "???", "sideways")];
        assert!(filter_categories(&junk, JobStatus::Interview).is_empty());
    }

    #[test]
    fn test_filter_keeps_everything_for_early_statuses() {
        let cats = vec![
            cat(1, "a", "positive"),
            cat(2, "b", "negative"),
            cat(3, "c", "neutral"),
        ];
        assert_eq!(filter_categories(&cats, JobStatus::Applied).len(), 3);
        assert_eq!(filter_categories(&cats, JobStatus::Interview).len(), 3);
    }
}
