use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::api::JobStore;
use crate::form::FormState;
use crate::models::{FeedbackPayload, FeedbackSection, JobPayload, JobStatus};

/// What a submit resolved to. The caller decides what to do next (print,
/// navigate, exit code); nothing in here touches the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Every required write landed.
    Saved { job_id: i64 },
    /// Some step failed. Writes that already landed stay applied; there is
    /// no rollback. One message per failed step.
    PartialFailure {
        job_id: Option<i64>,
        errors: Vec<String>,
    },
    /// Nothing was sent: required fields missing, or a submit was already
    /// in flight.
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FeedbackAction {
    Create,
    Update,
    Delete,
    Skip,
}

/// Sequences the writes for one submit: the job record first (so the id
/// exists), then the feedback decision and the Q&A replace side by side.
pub struct SaveOrchestrator {
    in_flight: AtomicBool,
}

impl SaveOrchestrator {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn submit(&self, store: &dyn JobStore, form: &FormState) -> SubmitOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return SubmitOutcome::Rejected {
                reason: "a save is already in progress".to_string(),
            };
        }
        let _guard = InFlightGuard(&self.in_flight);
        run_submit(store, form).await
    }
}

// Clears the flag however the submit resolves, including an early drop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run_submit(store: &dyn JobStore, form: &FormState) -> SubmitOutcome {
    if let Some(reason) = validate(form) {
        return SubmitOutcome::Rejected { reason };
    }

    let job_payload = build_job_payload(form);

    // The job write must resolve first: every sub-resource is addressed by
    // the (possibly newly assigned) job id.
    let job_id = match form.job_id {
        Some(id) => {
            if let Err(e) = store.update_job(id, &job_payload).await {
                return SubmitOutcome::PartialFailure {
                    job_id: Some(id),
                    errors: vec![format!("failed to save job: {e}")],
                };
            }
            id
        }
        None => match store.create_job(&job_payload).await {
            Ok(id) => id,
            Err(e) => {
                return SubmitOutcome::PartialFailure {
                    job_id: None,
                    errors: vec![format!("failed to save job: {e}")],
                };
            }
        },
    };

    let action = feedback_action(form);
    debug!("job #{} saved, feedback action {:?}", job_id, action);

    let feedback_step = async {
        match action {
            FeedbackAction::Create => store
                .create_feedback(job_id, &build_feedback_payload(form))
                .await
                .map_err(|e| format!("failed to save feedback: {e}")),
            FeedbackAction::Update => store
                .update_feedback(job_id, &build_feedback_payload(form))
                .await
                .map_err(|e| format!("failed to save feedback: {e}")),
            FeedbackAction::Delete => store
                .delete_feedback(job_id)
                .await
                .map_err(|e| format!("failed to save feedback: {e}")),
            FeedbackAction::Skip => Ok(()),
        }
    };

    let qa_step = async {
        if form.qa.is_empty() {
            return Ok(());
        }
        store
            .replace_interview_qas(job_id, &form.qa)
            .await
            .map_err(|e| format!("failed to save interview questions: {e}"))
    };

    // Independent once the job id is known; one failing must not stop the
    // other from being attempted.
    let (feedback_result, qa_result) = tokio::join!(feedback_step, qa_step);

    let errors: Vec<String> = [feedback_result, qa_result]
        .into_iter()
        .filter_map(Result::err)
        .collect();

    if errors.is_empty() {
        SubmitOutcome::Saved { job_id }
    } else {
        SubmitOutcome::PartialFailure {
            job_id: Some(job_id),
            errors,
        }
    }
}

fn validate(form: &FormState) -> Option<String> {
    let mut missing = Vec::new();
    if form.job_title.trim().is_empty() {
        missing.push("job title");
    }
    if form.company.trim().is_empty() {
        missing.push("company");
    }
    if missing.is_empty() {
        None
    } else {
        Some(format!("missing required field(s): {}", missing.join(", ")))
    }
}

/// Emptiness is judged on the raw form fields, before the status-based
/// zeroing, so strengths typed under a rejected status still count as
/// content.
fn feedback_is_empty(form: &FormState) -> bool {
    form.feedback_summary.trim().is_empty()
        && form.category_id.is_none()
        && form.detailed_feedback.trim().is_empty()
        && form.strengths.is_empty()
        && form.improvements.is_empty()
}

fn feedback_action(form: &FormState) -> FeedbackAction {
    let empty = feedback_is_empty(form);
    match (form.feedback_id, empty) {
        // A record exists and the user blanked everything out.
        (Some(_), true) => FeedbackAction::Delete,
        (Some(_), false) => FeedbackAction::Update,
        (None, false) => FeedbackAction::Create,
        (None, true) => FeedbackAction::Skip,
    }
}

/// Client-only fields (the summary, the reference lists, the Q&A slots)
/// never ride along on the job record.
fn build_job_payload(form: &FormState) -> JobPayload {
    JobPayload {
        user_id: form.user_id,
        job_title: form.job_title.clone(),
        company: form.company.clone(),
        role_category: form.role_category.clone(),
        status: form.status,
        general_notes: form.general_notes.clone(),
        applied_date: form.applied_date.clone(),
        interview_date: form.interview_date.clone(),
        offer_date: form.offer_date.clone(),
        accepted_date: form.accepted_date.clone(),
        rejected_date: form.rejected_date.clone(),
    }
}

/// The inapplicable section is zeroed client-side: improvements only travel
/// for a rejected status, strengths only for offer/accepted. The zeroed
/// section still goes on the wire (empty priority, empty list) so the server
/// clears anything previously stored.
fn build_feedback_payload(form: &FormState) -> FeedbackPayload {
    let strengths = match form.status {
        JobStatus::Offer | JobStatus::Accepted => form.strengths.clone(),
        _ => FeedbackSection::default(),
    };
    let improvements = match form.status {
        JobStatus::Rejected => form.improvements.clone(),
        _ => FeedbackSection::default(),
    };
    FeedbackPayload {
        notes: truncate_summary(&form.feedback_summary),
        category_id: form.category_id,
        detailed_feedback: form.detailed_feedback.clone(),
        strengths,
        improvements,
    }
}

/// The notes field carries at most the first 50 characters of the summary.
fn truncate_summary(summary: &str) -> String {
    summary.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::InterviewQa;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateJob(JobPayload),
        UpdateJob(i64, JobPayload),
        CreateFeedback(i64, FeedbackPayload),
        UpdateFeedback(i64, FeedbackPayload),
        DeleteFeedback(i64),
        ReplaceQas(i64, Vec<InterviewQa>),
    }

    #[derive(Default)]
    struct MockStore {
        calls: Mutex<Vec<Call>>,
        fail_job: bool,
        fail_feedback: bool,
        fail_qas: bool,
        yield_in_create: bool,
    }

    impl MockStore {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn boom() -> ApiError {
            ApiError::Api {
                status: 500,
                message: "boom".to_string(),
            }
        }
    }

    #[async_trait]
    impl JobStore for MockStore {
        async fn create_job(&self, payload: &JobPayload) -> Result<i64, ApiError> {
            if self.yield_in_create {
                tokio::task::yield_now().await;
            }
            self.record(Call::CreateJob(payload.clone()));
            if self.fail_job {
                return Err(Self::boom());
            }
            Ok(42)
        }

        async fn update_job(&self, job_id: i64, payload: &JobPayload) -> Result<(), ApiError> {
            self.record(Call::UpdateJob(job_id, payload.clone()));
            if self.fail_job {
                return Err(Self::boom());
            }
            Ok(())
        }

        async fn create_feedback(
            &self,
            job_id: i64,
            payload: &FeedbackPayload,
        ) -> Result<(), ApiError> {
            self.record(Call::CreateFeedback(job_id, payload.clone()));
            if self.fail_feedback {
                return Err(Self::boom());
            }
            Ok(())
        }

        async fn update_feedback(
            &self,
            job_id: i64,
            payload: &FeedbackPayload,
        ) -> Result<(), ApiError> {
            self.record(Call::UpdateFeedback(job_id, payload.clone()));
            if self.fail_feedback {
                return Err(Self::boom());
            }
            Ok(())
        }

        async fn delete_feedback(&self, job_id: i64) -> Result<(), ApiError> {
            self.record(Call::DeleteFeedback(job_id));
            if self.fail_feedback {
                return Err(Self::boom());
            }
            Ok(())
        }

        async fn replace_interview_qas(
            &self,
            job_id: i64,
            qas: &[InterviewQa],
        ) -> Result<(), ApiError> {
            self.record(Call::ReplaceQas(job_id, qas.to_vec()));
            if self.fail_qas {
                return Err(Self::boom());
            }
            Ok(())
        }
    }

    fn minimal_form() -> FormState {
        let mut form = FormState::new();
        form.job_title = "Engineer".to_string();
        form.company = "Acme".to_string();
        form
    }

    #[tokio::test]
    async fn test_new_record_blank_feedback_is_one_create_call() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let form = minimal_form();

        let outcome = orch.submit(&store, &form).await;
        assert_eq!(outcome, SubmitOutcome::Saved { job_id: 42 });

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::CreateJob(_)));
    }

    #[tokio::test]
    async fn test_blanked_feedback_with_prior_id_is_deleted() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.job_id = Some(7);
        form.feedback_id = Some(3);

        let outcome = orch.submit(&store, &form).await;
        assert_eq!(outcome, SubmitOutcome::Saved { job_id: 7 });

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::UpdateJob(7, _)));
        assert_eq!(calls[1], Call::DeleteFeedback(7));
    }

    #[tokio::test]
    async fn test_failed_feedback_delete_reports_as_feedback_save() {
        let store = MockStore {
            fail_feedback: true,
            ..MockStore::default()
        };
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.job_id = Some(7);
        form.feedback_id = Some(3);

        let outcome = orch.submit(&store, &form).await;
        match outcome {
            SubmitOutcome::PartialFailure { job_id, errors } => {
                assert_eq!(job_id, Some(7));
                assert_eq!(errors.len(), 1);
                // The user blanked the feedback out; the delete is just how
                // that save lands, so the message reads the same way.
                assert!(errors[0].starts_with("failed to save feedback"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transmitted_notes_are_first_fifty_chars() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        let long = "x".repeat(49) + "yz-this-part-gets-cut";
        form.feedback_summary = long.clone();

        orch.submit(&store, &form).await;

        let notes = store
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::CreateFeedback(_, payload) => Some(payload.notes),
                _ => None,
            })
            .expect("feedback should have been created");
        assert_eq!(notes, long.chars().take(50).collect::<String>());
        assert_eq!(notes.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_rejected_end_to_end_zeroes_strengths() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = FormState::new();
        form.job_title = "X".to_string();
        form.company = "Y".to_string();
        form.set_status(JobStatus::Rejected);
        form.improvements.priority = "Communication".to_string();

        let outcome = orch.submit(&store, &form).await;
        assert_eq!(outcome, SubmitOutcome::Saved { job_id: 42 });

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::CreateJob(_)));
        match &calls[1] {
            Call::CreateFeedback(42, payload) => {
                assert_eq!(payload.improvements.priority, "Communication");
                assert_eq!(payload.strengths.priority, "");
                assert!(payload.strengths.additional.is_empty());
            }
            other => panic!("unexpected call: {other:?}"),
        }
        // Empty Q&A list means no bulk replace.
        assert!(!calls.iter().any(|c| matches!(c, Call::ReplaceQas(..))));
    }

    #[tokio::test]
    async fn test_edit_with_prior_feedback_updates_not_creates() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.job_id = Some(7);
        form.feedback_id = Some(3);
        form.category_id = Some(2);
        form.feedback_summary = "Good culture fit".to_string();

        let outcome = orch.submit(&store, &form).await;
        assert_eq!(outcome, SubmitOutcome::Saved { job_id: 7 });

        let calls = store.calls();
        assert!(matches!(calls[0], Call::UpdateJob(7, _)));
        match &calls[1] {
            Call::UpdateFeedback(7, payload) => {
                assert_eq!(payload.notes, "Good culture fit");
                assert_eq!(payload.category_id, Some(2));
            }
            other => panic!("unexpected call: {other:?}"),
        }
        assert!(!calls.iter().any(|c| matches!(c, Call::CreateFeedback(..))));
    }

    #[tokio::test]
    async fn test_strengths_typed_under_rejected_still_count_as_content() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.set_status(JobStatus::Rejected);
        // Only strengths were filled in; they get zeroed on the wire, but
        // their presence means create, not skip.
        form.strengths.priority = "Fast learner".to_string();

        orch.submit(&store, &form).await;

        let calls = store.calls();
        match &calls[1] {
            Call::CreateFeedback(_, payload) => {
                assert_eq!(payload.strengths.priority, "");
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_network_call() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let mut form = FormState::new();
        form.company = "Acme".to_string();

        let outcome = orch.submit(&store, &form).await;
        match outcome {
            SubmitOutcome::Rejected { reason } => assert!(reason.contains("job title")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_job_save_failure_suppresses_sub_resources() {
        let store = MockStore {
            fail_job: true,
            ..MockStore::default()
        };
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.feedback_summary = "something".to_string();
        form.qa.push(InterviewQa {
            id: None,
            question: "Q".to_string(),
            answer: "A".to_string(),
        });

        let outcome = orch.submit(&store, &form).await;
        match outcome {
            SubmitOutcome::PartialFailure { job_id, errors } => {
                assert_eq!(job_id, None);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("failed to save job"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_one_sub_resource_failing_does_not_stop_the_other() {
        let store = MockStore {
            fail_feedback: true,
            ..MockStore::default()
        };
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.feedback_summary = "notes".to_string();
        form.qa.push(InterviewQa {
            id: None,
            question: "Q".to_string(),
            answer: "A".to_string(),
        });

        let outcome = orch.submit(&store, &form).await;
        match outcome {
            SubmitOutcome::PartialFailure { job_id, errors } => {
                assert_eq!(job_id, Some(42));
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("failed to save feedback"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // The Q&A replace was still attempted and landed.
        assert!(store
            .calls()
            .iter()
            .any(|c| matches!(c, Call::ReplaceQas(42, _))));
    }

    #[tokio::test]
    async fn test_both_sub_resources_failing_reports_both() {
        let store = MockStore {
            fail_feedback: true,
            fail_qas: true,
            ..MockStore::default()
        };
        let orch = SaveOrchestrator::new();
        let mut form = minimal_form();
        form.feedback_summary = "notes".to_string();
        form.qa.push(InterviewQa {
            id: None,
            question: "Q".to_string(),
            answer: "A".to_string(),
        });

        let outcome = orch.submit(&store, &form).await;
        match outcome {
            SubmitOutcome::PartialFailure { errors, .. } => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.starts_with("failed to save feedback")));
                assert!(errors
                    .iter()
                    .any(|e| e.starts_with("failed to save interview questions")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let store = MockStore {
            yield_in_create: true,
            ..MockStore::default()
        };
        let orch = SaveOrchestrator::new();
        let form = minimal_form();

        // The first submit parks at the yield point inside create_job; the
        // second is polled while the first is unresolved.
        let (first, second) = tokio::join!(orch.submit(&store, &form), orch.submit(&store, &form));

        let outcomes = [first, second];
        assert!(outcomes
            .iter()
            .any(|o| *o == SubmitOutcome::Saved { job_id: 42 }));
        assert!(outcomes.iter().any(|o| matches!(
            o,
            SubmitOutcome::Rejected { reason } if reason.contains("already in progress")
        )));
        // Only one create ever reached the store.
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_flag_clears_after_resolution() {
        let store = MockStore::default();
        let orch = SaveOrchestrator::new();
        let form = minimal_form();

        assert_eq!(orch.submit(&store, &form).await, SubmitOutcome::Saved { job_id: 42 });
        // A later submit goes through again.
        assert_eq!(orch.submit(&store, &form).await, SubmitOutcome::Saved { job_id: 42 });
    }

    #[test]
    fn test_job_payload_strips_client_only_fields() {
        let mut form = minimal_form();
        form.feedback_summary = "summary".to_string();
        form.role_category = Some("Backend".to_string());

        let payload = build_job_payload(&form);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("feedback").is_none());
        assert!(json.get("feedbackSummary").is_none());
        assert!(json.get("feedback_summary").is_none());
        assert_eq!(json["company"], "Acme");
    }

    #[test]
    fn test_truncate_summary_is_char_aware() {
        let s = "é".repeat(60);
        assert_eq!(truncate_summary(&s).chars().count(), 50);
        assert_eq!(truncate_summary("short"), "short");
    }
}
