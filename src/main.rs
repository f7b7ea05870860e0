mod api;
mod auth;
mod form;
mod models;
mod policy;
mod questions;
mod submit;
mod tui;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{ApiClient, ApiError};
use form::FormState;
use models::{InterviewQa, JobApplication, JobStatus};
use submit::{SaveOrchestrator, SubmitOutcome};

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Job application tracking - record applications, feedback, and interview prep")]
struct Cli {
    /// Base URL of the tracker API
    #[arg(
        long,
        global = true,
        env = "APPTRACK_API_URL",
        default_value = api::DEFAULT_BASE_URL
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session credential
    Login {
        /// Account email
        email: String,

        /// Password (prompted on stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Discard the stored session credential
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Record a new job application
    Add {
        #[command(flatten)]
        fields: FormFields,
    },

    /// Edit an existing application (unset flags keep their stored values)
    Edit {
        /// Application ID
        id: i64,

        #[command(flatten)]
        fields: FormFields,
    },

    /// List applications
    List {
        /// Filter by status (applied, interview, offer, accepted, rejected)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one application in full, with feedback, Q&A, and status history
    Show {
        /// Application ID
        id: i64,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,
    },

    /// List feedback categories
    Categories {
        /// Only categories selectable for this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Browse the recommended interview question bank
    Questions {
        /// Scope to one application's bank instead of the global one
        #[arg(short, long)]
        job: Option<i64>,

        /// Filter by a search phrase
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Browse applications in a full-screen view
    Browse {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },
}

#[derive(Args)]
struct FormFields {
    /// Job title
    #[arg(long)]
    title: Option<String>,

    /// Company name
    #[arg(long)]
    company: Option<String>,

    /// Status (applied, interview, offer, accepted, rejected)
    #[arg(long)]
    status: Option<String>,

    /// Role category
    #[arg(long)]
    role: Option<String>,

    /// General notes
    #[arg(long)]
    notes: Option<String>,

    /// Applied date (YYYY-MM-DD; today is stamped automatically on new records)
    #[arg(long)]
    applied: Option<String>,

    /// Short feedback summary (only the first 50 characters are stored)
    #[arg(long)]
    summary: Option<String>,

    /// Feedback category id (see `apptrack categories`)
    #[arg(long)]
    category: Option<i64>,

    /// Detailed feedback text
    #[arg(long)]
    detailed: Option<String>,

    /// Headline strength
    #[arg(long)]
    strength_priority: Option<String>,

    /// Additional strength (repeatable)
    #[arg(long = "strength")]
    strengths: Vec<String>,

    /// Headline improvement area
    #[arg(long)]
    improvement_priority: Option<String>,

    /// Additional improvement area (repeatable)
    #[arg(long = "improvement")]
    improvements: Vec<String>,

    /// Interview Q&A entry as "question :: answer" (repeatable, replaces the
    /// stored set)
    #[arg(long = "qa")]
    qa: Vec<String>,

    /// Append a recommended question by id (repeatable; see `apptrack
    /// questions` for the bank)
    #[arg(long = "qa-from")]
    qa_from: Vec<i64>,

    /// Blank out all feedback fields (on edit this deletes stored feedback)
    #[arg(long)]
    clear_feedback: bool,
}

impl FormFields {
    fn apply_to(&self, form: &mut FormState) -> Result<()> {
        if let Some(title) = &self.title {
            form.job_title = title.clone();
        }
        if let Some(company) = &self.company {
            form.company = company.clone();
        }
        if let Some(status) = &self.status {
            form.set_status(status.parse()?);
        }
        if let Some(role) = &self.role {
            form.role_category = Some(role.clone());
        }
        if let Some(notes) = &self.notes {
            form.general_notes = Some(notes.clone());
        }
        if let Some(applied) = &self.applied {
            form.applied_date = Some(applied.clone());
        }

        if self.clear_feedback {
            form.feedback_summary.clear();
            form.category_id = None;
            form.detailed_feedback.clear();
            form.strengths = Default::default();
            form.improvements = Default::default();
        }
        if let Some(summary) = &self.summary {
            form.feedback_summary = summary.clone();
        }
        if let Some(category) = self.category {
            form.category_id = Some(category);
        }
        if let Some(detailed) = &self.detailed {
            form.detailed_feedback = detailed.clone();
        }
        if let Some(priority) = &self.strength_priority {
            form.strengths.priority = priority.clone();
        }
        if !self.strengths.is_empty() {
            form.strengths.additional = self.strengths.clone();
        }
        if let Some(priority) = &self.improvement_priority {
            form.improvements.priority = priority.clone();
        }
        if !self.improvements.is_empty() {
            form.improvements.additional = self.improvements.clone();
        }

        if !self.qa.is_empty() {
            form.set_qa(self.qa.iter().map(|raw| parse_qa(raw)).collect());
        }
        Ok(())
    }
}

/// Appends bank questions to the form by id. Each one lands in a fresh Q&A
/// slot and reserves its id so it stops suggesting.
fn attach_bank_questions(form: &mut FormState, ids: &[i64]) -> Result<()> {
    for &id in ids {
        if form.used_question_ids.contains(&id) {
            return Err(anyhow!("Recommended question #{} is already attached", id));
        }
        let suggestion = form
            .question_bank
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "No recommended question #{}; run 'apptrack questions' to list the bank",
                    id
                )
            })?;
        form.add_qa();
        let slot = form.qa.len() - 1;
        form.select_suggestion(slot, &suggestion);
    }
    Ok(())
}

/// Splits a "question :: answer" flag. A missing separator means the whole
/// string is the question with no answer yet.
fn parse_qa(raw: &str) -> InterviewQa {
    let (question, answer) = raw.split_once("::").unwrap_or((raw, ""));
    InterviewQa {
        id: None,
        question: question.trim().to_string(),
        answer: answer.trim().to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            let client = ApiClient::new(&cli.api_url, None);
            let token = match client.login(&email, &password).await {
                Ok(token) => token,
                Err(ApiError::Unauthorized) => {
                    return Err(anyhow!("Login failed: invalid email or password"));
                }
                Err(e) => return Err(e.into()),
            };
            auth::save_token(&token)?;
            println!("Logged in as {}", email);
        }

        Commands::Logout => {
            auth::clear_token()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let client = signed_in_client(&cli.api_url)?;
            let user = client.current_user().await.map_err(handle_api_error)?;
            println!("{} <{}> (id {})", user.username, user.email, user.id);
        }

        Commands::Add { fields } => {
            let client = signed_in_client(&cli.api_url)?;
            let user = client.current_user().await.map_err(handle_api_error)?;

            let mut form = FormState::new();
            form.user_id = Some(user.id);
            fields.apply_to(&mut form)?;
            if !fields.qa_from.is_empty() {
                let bank = questions::fetch_candidates(&client, form.job_id)
                    .await
                    .map_err(handle_api_error)?;
                form.set_question_bank(bank);
                attach_bank_questions(&mut form, &fields.qa_from)?;
            }
            form.stamp_transition_date(&today());

            let orchestrator = SaveOrchestrator::new();
            let outcome = orchestrator.submit(&client, &form).await;
            report_outcome(outcome)?;
        }

        Commands::Edit { id, fields } => {
            let client = signed_in_client(&cli.api_url)?;
            let job = client.get_job(id).await.map_err(handle_api_error)?;

            let mut form = FormState::from_job(job);
            fields.apply_to(&mut form)?;
            if !fields.qa_from.is_empty() {
                let bank = questions::fetch_candidates(&client, form.job_id)
                    .await
                    .map_err(handle_api_error)?;
                form.set_question_bank(bank);
                attach_bank_questions(&mut form, &fields.qa_from)?;
            }
            form.stamp_transition_date(&today());

            let orchestrator = SaveOrchestrator::new();
            let outcome = orchestrator.submit(&client, &form).await;
            report_outcome(outcome)?;
        }

        Commands::List { status } => {
            let client = signed_in_client(&cli.api_url)?;
            let jobs = fetch_jobs(&client, status.as_deref()).await?;
            if jobs.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<10} {:<30} {:<20} {:<12}",
                    "ID", "STATUS", "TITLE", "COMPANY", "APPLIED"
                );
                println!("{}", "-".repeat(82));
                for job in jobs {
                    println!(
                        "{:<6} {:<10} {:<30} {:<20} {:<12}",
                        job.id.unwrap_or_default(),
                        job.status,
                        truncate(&job.job_title, 28),
                        truncate(&job.company, 18),
                        truncate(job.applied_date.as_deref().unwrap_or("-"), 10),
                    );
                }
            }
        }

        Commands::Show { id } => {
            let client = signed_in_client(&cli.api_url)?;
            let job = client.get_job(id).await.map_err(handle_api_error)?;
            print_job(&job);

            let qas = client.interview_qas(id).await.map_err(handle_api_error)?;
            if !qas.is_empty() {
                println!("\nInterview Q&A:");
                for qa in &qas {
                    println!("  Q: {}", qa.question);
                    if !qa.answer.is_empty() {
                        println!("  A: {}", qa.answer);
                    }
                }
            }

            let history = client.status_history(id).await.map_err(handle_api_error)?;
            if !history.is_empty() {
                println!("\nStatus history:");
                for entry in &history {
                    println!("  {} - {}", entry.changed_at, entry.status);
                }
            }
        }

        Commands::Delete { id } => {
            let client = signed_in_client(&cli.api_url)?;
            client.delete_job(id).await.map_err(handle_api_error)?;
            println!("Deleted application #{}", id);
        }

        Commands::Categories { status } => {
            let client = signed_in_client(&cli.api_url)?;
            let all = client.feedback_categories().await.map_err(handle_api_error)?;
            let categories = match status.as_deref() {
                Some(s) => policy::filter_categories(&all, s.parse()?),
                None => all,
            };
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<6} {:<10} {:<40}", "ID", "TYPE", "NAME");
                println!("{}", "-".repeat(58));
                for cat in categories {
                    println!(
                        "{:<6} {:<10} {:<40}",
                        cat.id,
                        truncate(&cat.category_type, 8),
                        truncate(&cat.name, 38)
                    );
                }
            }
        }

        Commands::Questions { job, query } => {
            let client = signed_in_client(&cli.api_url)?;
            let bank = questions::fetch_candidates(&client, job)
                .await
                .map_err(handle_api_error)?;
            let shown: Vec<&models::RecommendedQuestion> = match query.as_deref() {
                Some(q) => questions::filter_candidates(&bank, &Default::default(), q),
                None => bank.iter().collect(),
            };
            if shown.is_empty() {
                println!("No questions found.");
            } else {
                for question in shown {
                    println!("{:<6} {}", question.id, question.text);
                }
            }
        }

        Commands::Browse { status } => {
            let client = signed_in_client(&cli.api_url)?;
            let jobs = fetch_jobs(&client, status.as_deref()).await?;
            tui::run_browse(jobs)?;
        }
    }

    Ok(())
}

fn signed_in_client(api_url: &str) -> Result<ApiClient> {
    let token = auth::load_token()?
        .ok_or_else(|| anyhow!("Not signed in. Run 'apptrack login <email>' first."))?;
    Ok(ApiClient::new(api_url, Some(token)))
}

/// A 401 means the stored credential is stale; drop it so the next command
/// starts clean, and tell the user what to do.
fn handle_api_error(err: ApiError) -> anyhow::Error {
    if matches!(err, ApiError::Unauthorized) {
        let _ = auth::clear_token();
        anyhow!("Session expired or invalid. Run 'apptrack login <email>' to sign in again.")
    } else {
        err.into()
    }
}

async fn fetch_jobs(client: &ApiClient, status: Option<&str>) -> Result<Vec<JobApplication>> {
    let wanted: Option<JobStatus> = status.map(str::parse).transpose()?;
    let mut jobs = client.list_jobs().await.map_err(handle_api_error)?;
    if let Some(wanted) = wanted {
        jobs.retain(|job| job.status == wanted);
    }
    Ok(jobs)
}

/// Turns the structured submit outcome into terminal output and an exit
/// status. Partial failures list what did not land; what already landed
/// stays applied.
fn report_outcome(outcome: SubmitOutcome) -> Result<()> {
    match outcome {
        SubmitOutcome::Saved { job_id } => {
            println!("Saved application #{}", job_id);
            Ok(())
        }
        SubmitOutcome::PartialFailure { job_id, errors } => {
            match job_id {
                Some(id) => eprintln!("Application #{} saved, but not everything went through:", id),
                None => eprintln!("Save failed:"),
            }
            for error in &errors {
                eprintln!("  - {}", error);
            }
            Err(anyhow!("{} step(s) failed", errors.len()))
        }
        SubmitOutcome::Rejected { reason } => Err(anyhow!(reason)),
    }
}

fn print_job(job: &JobApplication) {
    println!("Application #{}", job.id.unwrap_or_default());
    println!("Title: {}", job.job_title);
    println!("Company: {}", job.company);
    if let Some(role) = &job.role_category {
        println!("Role: {}", role);
    }
    println!("Status: {}", job.status);
    let dates = [
        ("Applied", &job.applied_date),
        ("Interview", &job.interview_date),
        ("Offer", &job.offer_date),
        ("Accepted", &job.accepted_date),
        ("Rejected", &job.rejected_date),
    ];
    for (label, date) in dates {
        if let Some(date) = date {
            println!("{}: {}", label, date);
        }
    }
    if let Some(notes) = &job.general_notes {
        if !notes.trim().is_empty() {
            println!("Notes: {}", notes);
        }
    }
    if let Some(feedback) = &job.feedback {
        println!("\nFeedback:");
        if !feedback.notes.trim().is_empty() {
            println!("  Summary: {}", feedback.notes);
        }
        if let Some(category) = feedback.category_id {
            println!("  Category: {}", category);
        }
        if !feedback.detailed_feedback.trim().is_empty() {
            println!("  Details: {}", feedback.detailed_feedback);
        }
        if !feedback.strengths.is_empty() {
            println!("  Strengths: {}", feedback.strengths.priority);
            for extra in &feedback.strengths.additional {
                println!("    - {}", extra);
            }
        }
        if !feedback.improvements.is_empty() {
            println!("  Improvements: {}", feedback.improvements.priority);
            for extra in &feedback.improvements.additional {
                println!("    - {}", extra);
            }
        }
    }
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// Char-aware: byte slicing would panic on multibyte titles.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qa_splits_on_separator() {
        let qa = parse_qa("Why this role? :: Growth and scope");
        assert_eq!(qa.question, "Why this role?");
        assert_eq!(qa.answer, "Growth and scope");
        assert_eq!(qa.id, None);
    }

    #[test]
    fn test_parse_qa_without_separator_is_question_only() {
        let qa = parse_qa("Tell me about yourself");
        assert_eq!(qa.question, "Tell me about yourself");
        assert_eq!(qa.answer, "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long title here", 10), "a rathe...");
    }

    #[test]
    fn test_truncate_multibyte_titles() {
        // Accented company names long enough to cut must not panic on a
        // char boundary.
        let s = "é".repeat(12);
        assert_eq!(truncate(&s, 10), format!("{}...", "é".repeat(7)));
        assert_eq!(truncate("Müller Straße GmbH München", 10), "Müller ...");
        assert_eq!(truncate(&"é".repeat(10), 10), "é".repeat(10));
    }

    fn form_with_bank() -> FormState {
        let mut form = FormState::new();
        form.set_question_bank(vec![
            models::RecommendedQuestion {
                id: 5,
                text: "Tell me about a failure".to_string(),
            },
            models::RecommendedQuestion {
                id: 9,
                text: "Why this company?".to_string(),
            },
        ]);
        form
    }

    #[test]
    fn test_attach_bank_questions_fills_slots_and_reserves_ids() {
        let mut form = form_with_bank();
        attach_bank_questions(&mut form, &[9, 5]).unwrap();

        assert_eq!(form.qa.len(), 2);
        assert_eq!(form.qa[0].question, "Why this company?");
        assert_eq!(form.qa[0].id, Some(9));
        assert_eq!(form.qa[1].id, Some(5));
        assert!(form.used_question_ids.contains(&9));
        assert!(form.used_question_ids.contains(&5));
    }

    #[test]
    fn test_attach_bank_questions_rejects_duplicate() {
        let mut form = form_with_bank();
        attach_bank_questions(&mut form, &[5]).unwrap();

        let err = attach_bank_questions(&mut form, &[5]).unwrap_err();
        assert!(err.to_string().contains("already attached"));
        assert_eq!(form.qa.len(), 1);
    }

    #[test]
    fn test_attach_bank_questions_rejects_unknown_id() {
        let mut form = form_with_bank();
        let err = attach_bank_questions(&mut form, &[123]).unwrap_err();
        assert!(err.to_string().contains("No recommended question #123"));
        assert!(form.qa.is_empty());
    }
}
