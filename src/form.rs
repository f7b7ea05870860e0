use std::collections::HashSet;

use crate::models::{
    FeedbackCategory, FeedbackSection, InterviewQa, JobApplication, JobStatus,
    RecommendedQuestion,
};
use crate::policy;
use crate::questions;

/// The record being edited, plus everything that never leaves the client:
/// the short feedback summary, the Q&A slots, the recommended-question
/// exclusion set, and the reference lists.
#[derive(Debug)]
pub struct FormState {
    pub job_id: Option<i64>,
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

    /// Authoritative source of the 50-character notes summary, independent
    /// of the longer detailed_feedback text.
    pub feedback_summary: String,
    /// Set when a feedback record already exists on the server.
    pub feedback_id: Option<i64>,
    pub category_id: Option<i64>,
    pub detailed_feedback: String,
    pub strengths: FeedbackSection,
    pub improvements: FeedbackSection,

    pub qa: Vec<InterviewQa>,
    pub used_question_ids: HashSet<i64>,

    pub categories: Vec<FeedbackCategory>,
    pub filtered_categories: Vec<FeedbackCategory>,
    pub question_bank: Vec<RecommendedQuestion>,
}

impl FormState {
    pub fn new() -> Self {
        Self {
            job_id: None,
            user_id: None,
            job_title: String::new(),
            company: String::new(),
            role_category: None,
            status: JobStatus::Applied,
            general_notes: None,
            applied_date: None,
            interview_date: None,
            offer_date: None,
            accepted_date: None,
            rejected_date: None,
            feedback_summary: String::new(),
            feedback_id: None,
            category_id: None,
            detailed_feedback: String::new(),
            strengths: FeedbackSection::default(),
            improvements: FeedbackSection::default(),
            qa: Vec::new(),
            used_question_ids: HashSet::new(),
            categories: Vec::new(),
            filtered_categories: Vec::new(),
            question_bank: Vec::new(),
        }
    }

    /// Seeds the form from a previously saved record. The feedback summary
    /// starts out as the stored notes.
    pub fn from_job(job: JobApplication) -> Self {
        let mut state = Self::new();
        state.job_id = job.id;
        state.user_id = job.user_id;
        state.job_title = job.job_title;
        state.company = job.company;
        state.role_category = job.role_category;
        state.status = job.status;
        state.general_notes = job.general_notes;
        state.applied_date = job.applied_date;
        state.interview_date = job.interview_date;
        state.offer_date = job.offer_date;
        state.accepted_date = job.accepted_date;
        state.rejected_date = job.rejected_date;

        if let Some(feedback) = job.feedback {
            state.feedback_id = feedback.id;
            state.feedback_summary = feedback.notes;
            state.category_id = feedback.category_id;
            state.detailed_feedback = feedback.detailed_feedback;
            state.strengths = feedback.strengths;
            state.improvements = feedback.improvements;
        }
        state
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.refilter_categories();
    }

    pub fn set_categories(&mut self, categories: Vec<FeedbackCategory>) {
        self.categories = categories;
        self.refilter_categories();
    }

    fn refilter_categories(&mut self) {
        self.filtered_categories = policy::filter_categories(&self.categories, self.status);
    }

    pub fn set_question_bank(&mut self, bank: Vec<RecommendedQuestion>) {
        self.question_bank = bank;
    }

    /// Replaces the Q&A slots, rebuilding the exclusion set from entries that
    /// came from the bank.
    pub fn set_qa(&mut self, qa: Vec<InterviewQa>) {
        self.used_question_ids = qa.iter().filter_map(|entry| entry.id).collect();
        self.qa = qa;
    }

    pub fn add_qa(&mut self) {
        self.qa.push(InterviewQa {
            id: None,
            question: String::new(),
            answer: String::new(),
        });
    }

    /// Removes a slot. If it carried a bank id, that question becomes
    /// suggestible again.
    pub fn remove_qa(&mut self, index: usize) {
        if index >= self.qa.len() {
            return;
        }
        let removed = self.qa.remove(index);
        if let Some(id) = removed.id {
            self.used_question_ids.remove(&id);
        }
    }

    /// Fills a slot from a bank suggestion and takes the question out of the
    /// suggestion pool.
    pub fn select_suggestion(&mut self, index: usize, suggestion: &RecommendedQuestion) {
        let Some(entry) = self.qa.get_mut(index) else {
            return;
        };
        entry.id = Some(suggestion.id);
        entry.question = suggestion.text.clone();
        self.used_question_ids.insert(suggestion.id);
    }

    pub fn suggestions(&self, query: &str) -> Vec<&RecommendedQuestion> {
        questions::filter_candidates(&self.question_bank, &self.used_question_ids, query)
    }

    /// Writes `date` into the transition-date slot for the current status,
    /// unless one is already recorded.
    pub fn stamp_transition_date(&mut self, date: &str) {
        let slot = match self.status {
            JobStatus::Applied => &mut self.applied_date,
            JobStatus::Interview => &mut self.interview_date,
            JobStatus::Offer => &mut self.offer_date,
            JobStatus::Accepted => &mut self.accepted_date,
            JobStatus::Rejected => &mut self.rejected_date,
        };
        if slot.as_deref().map(str::trim).unwrap_or("").is_empty() {
            *slot = Some(date.to_string());
        }
    }
}
