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
use std::path::PathBuf;

use crate::db::Database;
use crate::export;
use crate::models::{format_date, RecruitApplication, Status};
use crate::review::ReviewBoard;

enum Mode {
    Normal,
    Search(String),
    ConfirmBatch,
}

struct AppState {
    board: ReviewBoard,
    cursor: usize,
    scroll_offset: u16,
    mode: Mode,
    message: Option<String>,
    export_dir: PathBuf,
    organization: String,
}

impl AppState {
    fn new(board: ReviewBoard, export_dir: PathBuf, organization: String) -> Self {
        Self {
            board,
            cursor: 0,
            scroll_offset: 0,
            mode: Mode::Normal,
            message: None,
            export_dir,
            organization,
        }
    }

    fn visible_len(&self) -> usize {
        self.board.filtered().len()
    }

    fn current(&self) -> Option<&RecruitApplication> {
        self.board.filtered().get(self.cursor).copied()
    }

    fn current_id(&self) -> Option<String> {
        self.current().map(|a| a.id.clone())
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn next(&mut self) {
        if self.cursor + 1 < self.visible_len() {
            self.cursor += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn cycle_filter(&mut self) {
        let next = match self.board.status_filter() {
            None => Some(Status::ALL[0]),
            Some(current) => Status::ALL
                .iter()
                .position(|s| *s == current)
                .and_then(|i| Status::ALL.get(i + 1).copied()),
        };
        self.board.set_status_filter(next);
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    fn set_status(&mut self, db: &Database, status: Status) {
        let Some(id) = self.current_id() else { return };
        self.message = Some(match self.board.update_status(db, &id, status) {
            Ok(()) => format!("Status set to {}", status.display_label()),
            Err(e) => format!("{:#}", e),
        });
        self.clamp_cursor();
    }

    fn batch_accept(&mut self, db: &Database) {
        self.message = Some(match self.board.accept_selected(db) {
            Ok(n) => format!("Batch complete: {} accepted", n),
            Err(e) => format!("{:#}", e),
        });
        self.clamp_cursor();
    }

    fn export(&mut self) {
        let selected = self.board.selected_records();
        self.message = Some(
            match export::write_export(&selected, &self.organization, &self.export_dir, None) {
                Ok(path) => format!("Exported {} row(s) to {}", selected.len(), path.display()),
                Err(e) => format!("{:#}", e),
            },
        );
    }

    fn reload(&mut self, db: &Database) {
        self.message = Some(match self.board.reconcile(db) {
            Ok(()) => "Reloaded".to_string(),
            Err(e) => format!("{:#}", e),
        });
        self.clamp_cursor();
    }
}

pub fn run_review(db: &Database, export_dir: PathBuf, organization: String) -> Result<()> {
    let board = ReviewBoard::load(db)?;
    if board.applications().is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(board, export_dir, organization);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(if state.visible_len() == 0 { None } else { Some(state.cursor) });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match &mut state.mode {
            Mode::Search(input) => match key.code {
                KeyCode::Enter => {
                    let term = input.clone();
                    state.board.set_search(&term);
                    state.mode = Mode::Normal;
                    state.cursor = 0;
                }
                KeyCode::Esc => state.mode = Mode::Normal,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            },
            Mode::ConfirmBatch => {
                state.mode = Mode::Normal;
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    state.batch_accept(db);
                } else {
                    state.message = Some("Batch cancelled".to_string());
                }
            }
            Mode::Normal => {
                state.message = None;
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => state.next(),
                    KeyCode::Up | KeyCode::Char('k') => state.prev(),
                    KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                    KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                    KeyCode::Char(' ') => {
                        if let Some(id) = state.current_id() {
                            state.board.toggle_select(&id);
                        }
                    }
                    KeyCode::Char('*') => state.board.toggle_select_all(),
                    KeyCode::Char('c') => state.board.clear_selection(),
                    KeyCode::Char('f') => state.cycle_filter(),
                    KeyCode::Char('/') => state.mode = Mode::Search(state.board.search().to_string()),
                    KeyCode::Char('p') => state.set_status(db, Status::Pending),
                    KeyCode::Char('v') => state.set_status(db, Status::Reviewed),
                    KeyCode::Char('a') => state.set_status(db, Status::Accepted),
                    KeyCode::Char('x') => state.set_status(db, Status::Rejected),
                    KeyCode::Char('A') => {
                        if state.board.selection_len() == 0 {
                            state.message = Some("Select applications first (space)".to_string());
                        } else {
                            state.mode = Mode::ConfirmBatch;
                        }
                    }
                    KeyCode::Char('e') => state.export(),
                    KeyCode::Char('r') => state.reload(db),
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Pending => Style::default().fg(Color::Yellow),
        Status::Reviewed => Style::default().fg(Color::Blue),
        Status::Accepted => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(2)])
        .split(frame.area());

    // Summary line
    let stats = state.board.stats();
    let summary = Paragraph::new(format!(
        " 전체 {}  대기 {}  검토 {}  합격 {}  불합격 {}",
        stats.total, stats.pending, stats.reviewed, stats.accepted, stats.rejected
    ))
    .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(summary, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: application list
    let visible = state.board.filtered();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|app| {
            let check = if state.board.is_selected(&app.id) { "[x]" } else { "[ ]" };
            let line = Line::from(vec![
                Span::raw(format!("{} ", check)),
                Span::styled(format!("{:<9}", app.status.as_str()), status_style(app.status)),
                Span::raw(format!(" {} | {}", truncate(&app.user_name, 16), truncate(&app.desired_field, 18))),
            ]);
            ListItem::new(line)
        })
        .collect();

    let filter = state.board.status_filter().map(|s| s.as_str()).unwrap_or("all");
    let mut title = format!(" Applications ({}/{}) [{}]", visible.len(), stats.total, filter);
    if !state.board.search().is_empty() {
        title.push_str(&format!(" /{}", state.board.search()));
    }
    if state.board.all_visible_selected() {
        title.push_str(" all selected");
    } else if state.board.selection_len() > 0 {
        title.push_str(&format!(" {} selected", state.board.selection_len()));
    }
    title.push(' ');

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: application detail
    let detail = Paragraph::new(build_detail(state.current()))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    // Footer: prompt, message, help
    let prompt = match &state.mode {
        Mode::Search(input) => format!(" search: {}_", input),
        Mode::ConfirmBatch => format!(
            " Set {} application(s) to accepted? (y/n)",
            state.board.selection_len()
        ),
        Mode::Normal => state
            .message
            .as_deref()
            .map(|m| format!(" {}", m))
            .unwrap_or_default(),
    };
    let footer = Paragraph::new(vec![
        Line::from(Span::styled(prompt, Style::default().fg(Color::Cyan))),
        Line::from(Span::styled(
            " j/k:move J/K:scroll space:select *:all f:filter /:search p/v/a/x:status A:accept selected e:export r:reload q:quit",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(footer, rows[2]);
}

fn build_detail(app: Option<&RecruitApplication>) -> Text<'_> {
    let Some(app) = app else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} ({})", app.user_name, app.gender.as_str()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status.display_label()),
        status_style(app.status),
    )));
    lines.push(Line::from(format!("지원분야: {}", app.desired_field)));
    lines.push(Line::from(format!("희망급여: {}만원", app.expected_salary)));
    lines.push(Line::from(format!("제출일: {}", format_date(app.created_at))));
    lines.push(Line::from(""));

    lines.push(Line::from(format!("Email: {}", app.email)));
    lines.push(Line::from(format!("Phone: {}", app.phone)));
    lines.push(Line::from(format!("Birth: {}", app.birth_date)));
    lines.push(Line::from(format!("Address: {} {}", app.address, app.detail_address)));
    if app.photo_url.is_some() {
        lines.push(Line::from(Span::styled(
            "(photo attached)",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));

    if !app.education.is_empty() {
        lines.push(Line::from(Span::styled(
            "EDUCATION",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for edu in &app.education {
            lines.push(Line::from(format!(
                "  {} ~ {}  {}",
                edu.admission_year, edu.graduation_year, edu.school_major
            )));
            if !edu.certificates.is_empty() {
                lines.push(Line::from(format!("    자격증: {}", edu.certificates)));
            }
        }
        lines.push(Line::from(""));
    }

    if !app.experience.is_empty() {
        lines.push(Line::from(Span::styled(
            "EXPERIENCE",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for exp in &app.experience {
            lines.push(Line::from(format!("  {}  {}", exp.period, exp.company_dept)));
            if !exp.duties.is_empty() {
                lines.push(Line::from(format!("    {}", exp.duties)));
            }
        }
        lines.push(Line::from(""));
    }

    if !app.self_intro.is_empty() {
        lines.push(Line::from(Span::styled(
            "SELF INTRODUCTION",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&app.self_intro, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
