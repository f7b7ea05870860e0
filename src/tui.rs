use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{JobApplication, JobStatus};

struct AppState {
    jobs: Vec<JobApplication>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(jobs: Vec<JobApplication>) -> Self {
        Self {
            jobs,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current_job(&self) -> Option<&JobApplication> {
        self.jobs.get(self.selected)
    }

    fn next(&mut self) {
        if !self.jobs.is_empty() && self.selected < self.jobs.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

/// Read-only browser over records fetched before the loop starts; no network
/// traffic happens while the terminal is in raw mode.
pub fn run_browse(jobs: Vec<JobApplication>) -> Result<()> {
    if jobs.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(jobs);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Applied => Style::default().fg(Color::Cyan),
        JobStatus::Interview => Style::default().fg(Color::Yellow),
        JobStatus::Offer => Style::default().fg(Color::Magenta),
        JobStatus::Accepted => Style::default().fg(Color::Green),
        JobStatus::Rejected => Style::default().fg(Color::Red),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(frame.area());

    // Left panel: application list
    let items: Vec<ListItem> = state
        .jobs
        .iter()
        .map(|job| {
            let status_icon = match job.status {
                JobStatus::Applied => " ",
                JobStatus::Interview => "*",
                JobStatus::Offer => "o",
                JobStatus::Accepted => "+",
                JobStatus::Rejected => "x",
            };
            let id = job.id.unwrap_or_default();
            let title = crate::truncate(&job.job_title, 35);
            ListItem::new(format!("{} #{:<4} {} | {}", status_icon, id, title, job.company))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) ", state.jobs.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: record detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(" j/k:navigate  J/K:scroll  q:quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(job) = state.current_job() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.job_title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));

    if let Some(role) = &job.role_category {
        lines.push(Line::from(format!("Role: {}", role)));
    }

    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status),
        status_style(job.status),
    )));

    let dates = [
        ("Applied", &job.applied_date),
        ("Interview", &job.interview_date),
        ("Offer", &job.offer_date),
        ("Accepted", &job.accepted_date),
        ("Rejected", &job.rejected_date),
    ];
    for (label, date) in dates {
        if let Some(date) = date {
            lines.push(Line::from(format!("{}: {}", label, date)));
        }
    }

    if let Some(notes) = &job.general_notes {
        if !notes.trim().is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Notes",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(notes, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
    }

    if let Some(feedback) = &job.feedback {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Feedback",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if !feedback.notes.trim().is_empty() {
            lines.push(Line::from(format!("  {}", feedback.notes)));
        }
        if !feedback.detailed_feedback.trim().is_empty() {
            for line in textwrap::fill(&feedback.detailed_feedback, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        if !feedback.strengths.is_empty() {
            lines.push(Line::from(Span::styled(
                "  Strengths",
                Style::default().fg(Color::Green),
            )));
            lines.push(Line::from(format!("    {}", feedback.strengths.priority)));
            for extra in &feedback.strengths.additional {
                lines.push(Line::from(format!("    - {}", extra)));
            }
        }
        if !feedback.improvements.is_empty() {
            lines.push(Line::from(Span::styled(
                "  Improvements",
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(format!("    {}", feedback.improvements.priority)));
            for extra in &feedback.improvements.additional {
                lines.push(Line::from(format!("    - {}", extra)));
            }
        }
    } else {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "(No feedback recorded)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}
