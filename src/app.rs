use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::debug;

use crate::actions::Action;
use crate::reconcile::{
    format_relative_time, reconcile_or_error, Category, Classification, GitStatusFact, Node,
    SessionEntry, Snapshot, Timestamp,
};
use crate::refresh::{RefreshOutcome, RepoTarget};
use crate::task::{self, CleanupItem};
use crate::naming;

/// Theme colors
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(217, 119, 87),
            dim: Color::Rgb(100, 100, 100),
            success: Color::Rgb(80, 200, 120),
            warning: Color::Rgb(255, 193, 7),
            error: Color::Rgb(220, 53, 69),
        }
    }
}

/// Input mode for the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Creating,
    Confirming,
}

/// Destructive operation waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    KillSession(String),
    RemoveWorktree { repo_root: PathBuf, path: String },
    Cleanup(Vec<CleanupItem>),
}

/// One line of the dashboard list
#[derive(Debug, Clone)]
pub enum Row {
    Header { repo: String, nodes: usize },
    Item {
        node: Node,
        depth: usize,
        repo_root: PathBuf,
    },
}

impl Row {
    fn node(&self) -> Option<&Node> {
        match self {
            Row::Item { node, .. } => Some(node),
            Row::Header { .. } => None,
        }
    }
}

/// Flatten reconciled repositories into display rows; group children follow their group
pub fn build_rows(repos: &[(RepoTarget, Snapshot)], filter: Category, now: Timestamp) -> Vec<Row> {
    let mut rows = Vec::new();
    for (target, snapshot) in repos {
        let nodes = reconcile_or_error(snapshot, filter, now);
        rows.push(Row::Header {
            repo: target.name.clone(),
            nodes: nodes.len(),
        });
        for node in nodes {
            let children = node.children();
            rows.push(Row::Item {
                node,
                depth: 0,
                repo_root: target.root.clone(),
            });
            rows.extend(children.into_iter().map(|child| Row::Item {
                node: child,
                depth: 1,
                repo_root: target.root.clone(),
            }));
        }
    }
    rows
}

/// Machine-readable form of one repository's view
#[derive(Debug, Serialize)]
pub struct RepoListing {
    pub repo: String,
    pub root: PathBuf,
    pub nodes: Vec<Node>,
}

pub fn listings(repos: &[(RepoTarget, Snapshot)], filter: Category, now: Timestamp) -> Vec<RepoListing> {
    repos
        .iter()
        .map(|(target, snapshot)| RepoListing {
            repo: target.name.clone(),
            root: target.root.clone(),
            nodes: reconcile_or_error(snapshot, filter, now),
        })
        .collect()
}

/// Plain-text rendering for `--list`
pub fn render_text(repos: &[(RepoTarget, Snapshot)], filter: Category, now: Timestamp) -> String {
    let mut out = String::new();
    for row in build_rows(repos, filter, now) {
        match row {
            Row::Header { repo, nodes } => {
                let _ = writeln!(out, "{} ({})", repo, nodes);
            }
            Row::Item { node, depth, .. } => {
                let indent = "  ".repeat(depth + 1);
                let (glyph, state) = node_state(&node);
                let _ = writeln!(
                    out,
                    "{}{} {:<24} {:<9} {}",
                    indent,
                    glyph,
                    node.label(),
                    state,
                    node_summary(&node, now)
                );
            }
        }
    }
    out
}

fn node_state(node: &Node) -> (&'static str, &'static str) {
    match node {
        Node::Group(_) => ("▸", "group"),
        Node::Session(entry) | Node::Detail(entry) => match entry.classification {
            Classification::Attached => ("●", "attached"),
            Classification::Alive => ("●", "alive"),
            Classification::Idle => ("◐", "idle"),
            Classification::Orphan => ("✗", "orphan"),
        },
        Node::InactivePlaceholder(_) => ("○", "stopped"),
        Node::Error(_) => ("!", "error"),
    }
}

fn git_counts(git: &GitStatusFact) -> String {
    if !git.is_dirty() {
        return String::new();
    }
    format!("+{} ~{} -{}", git.added, git.modified, git.deleted)
}

fn entry_summary(entry: &SessionEntry, now: Timestamp) -> String {
    let git = GitStatusFact {
        modified: entry.status.git_modified,
        added: entry.status.git_added,
        deleted: entry.status.git_deleted,
    };
    let mut summary = format_relative_time(entry.status.last_activity, now);
    let counts = git_counts(&git);
    if !counts.is_empty() {
        summary.push_str("  ");
        summary.push_str(&counts);
    }
    summary
}

/// Activity time and change counts for a node
fn node_summary(node: &Node, now: Timestamp) -> String {
    match node {
        Node::Group(group) => format!("{} sessions", group.children.len()),
        Node::Session(entry) | Node::Detail(entry) => entry_summary(entry, now),
        Node::InactivePlaceholder(placeholder) => {
            let mut summary = placeholder
                .last_modified
                .map(|ts| format!("edited {}", format_relative_time(ts, now)))
                .unwrap_or_default();
            let counts = git_counts(&placeholder.git);
            if !counts.is_empty() {
                if !summary.is_empty() {
                    summary.push_str("  ");
                }
                summary.push_str(&counts);
            }
            summary
        }
        Node::Error(error) => error.repo.clone(),
    }
}

/// Main application state
pub struct App {
    /// Latest snapshots per repository
    pub repos: Vec<(RepoTarget, Snapshot)>,
    /// Capture time of the latest pass
    pub captured_at: Timestamp,
    /// Generation of the latest applied pass
    pub generation: Option<u64>,
    pub filter: Category,
    pub rows: Vec<Row>,
    pub list_state: ListState,
    /// Current message to display (info or error)
    pub message: Option<String>,
    pub theme: Theme,
    pub input_mode: InputMode,
    pub confirm: Option<Confirm>,
    /// Slug typed into the new-task prompt
    pub input_buffer: String,
    /// Repository the new task goes into
    pub creating_in: Option<RepoTarget>,
    /// Pending action queue
    pub pending_actions: Vec<Action>,
}

impl App {
    pub fn new(filter: Category) -> Self {
        Self {
            repos: Vec::new(),
            captured_at: 0,
            generation: None,
            filter,
            rows: Vec::new(),
            list_state: ListState::default(),
            message: None,
            theme: Theme::default(),
            input_mode: InputMode::Normal,
            confirm: None,
            input_buffer: String::new(),
            creating_in: None,
            pending_actions: Vec::new(),
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.list_state.selected().and_then(|i| self.rows.get(i))
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected_row().and_then(Row::node)
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::RefreshCompleted(outcome) => {
                self.apply_refresh(outcome);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Install a refresh result unless a newer one was already shown
    pub fn apply_refresh(&mut self, outcome: RefreshOutcome) -> bool {
        if self.generation.is_some_and(|g| outcome.generation <= g) {
            debug!(
                generation = outcome.generation,
                current = ?self.generation,
                "discarding stale refresh"
            );
            return false;
        }
        self.generation = Some(outcome.generation);
        self.captured_at = outcome.captured_at;
        self.repos = outcome.repos;
        self.rebuild();
        true
    }

    /// Recompute rows, keeping the cursor on the same node when it survives
    fn rebuild(&mut self) {
        let previous = self
            .selected_row()
            .and_then(|row| match row {
                Row::Item { node, repo_root, .. } => {
                    Some((repo_root.clone(), node.key().to_string()))
                }
                Row::Header { .. } => None,
            });

        self.rows = build_rows(&self.repos, self.filter, self.captured_at);

        let restored = previous.and_then(|(root, key)| {
            self.rows.iter().position(|row| {
                matches!(row, Row::Item { node, repo_root, .. }
                    if *repo_root == root && node.key() == key)
            })
        });
        let selection = restored
            .or_else(|| {
                let current = self.list_state.selected().unwrap_or(0);
                self.selectable_from(current.min(self.rows.len().saturating_sub(1)))
            })
            .or_else(|| self.selectable_from(0));
        self.list_state.select(selection);
    }

    /// First item row at or after `start`, else the last one before it
    fn selectable_from(&self, start: usize) -> Option<usize> {
        (start..self.rows.len())
            .find(|&i| self.rows[i].node().is_some())
            .or_else(|| (0..start.min(self.rows.len())).rev().find(|&i| self.rows[i].node().is_some()))
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.message.is_some() && self.input_mode == InputMode::Normal {
            self.message = None;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Creating => self.handle_creating_key(key),
            InputMode::Confirming => self.handle_confirming_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            KeyCode::Char('j') | KeyCode::Down => self.step(1),
            KeyCode::Char('k') | KeyCode::Up => self.step(-1),
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.rebuild();
            }
            KeyCode::Char('r') => self.pending_actions.push(Action::Refresh),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('y') => self.copy_selected_path(),
            KeyCode::Char('n') => self.start_new_task(),
            KeyCode::Char('c') => self.request_cleanup(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_creating_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => {
                let slug = naming::task_slug(&self.input_buffer);
                match self.creating_in.take() {
                    Some(_) if slug.is_empty() => {
                        self.message = Some("Task name needs a letter or digit".to_string());
                    }
                    Some(repo) => self.pending_actions.push(Action::CreateTask { repo, slug }),
                    None => {}
                }
                self.input_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.creating_in = None;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                // Only allow valid slug characters
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    self.input_buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_confirming_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.confirm.take() {
                    Some(Confirm::KillSession(name)) => {
                        self.pending_actions.push(Action::KillSession(name));
                    }
                    Some(Confirm::RemoveWorktree { repo_root, path }) => {
                        self.pending_actions
                            .push(Action::RemoveWorktree { repo_root, path });
                    }
                    Some(Confirm::Cleanup(items)) => {
                        self.pending_actions.push(Action::Cleanup(items));
                    }
                    None => {}
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    /// Move the cursor over item rows, wrapping around
    fn step(&mut self, delta: isize) {
        let items: Vec<usize> = (0..self.rows.len())
            .filter(|&i| self.rows[i].node().is_some())
            .collect();
        if items.is_empty() {
            return;
        }
        let pos = self
            .list_state
            .selected()
            .and_then(|sel| items.iter().position(|&i| i == sel));
        let next = match pos {
            Some(p) => (p as isize + delta).rem_euclid(items.len() as isize) as usize,
            None => 0,
        };
        self.list_state.select(Some(items[next]));
    }

    fn open_selected(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        let create = matches!(node, Node::InactivePlaceholder(_));
        let Some((name, cwd)) = node.attach_target() else {
            return;
        };
        let action = Action::AttachSession {
            name: name.to_string(),
            cwd: cwd.map(str::to_string),
            create,
        };
        self.pending_actions.push(action);
    }

    fn request_delete(&mut self) {
        let Some(Row::Item { node, repo_root, .. }) = self.selected_row() else {
            return;
        };
        let confirm = match node {
            Node::Session(entry) | Node::Detail(entry) => Confirm::KillSession(entry.name.clone()),
            Node::InactivePlaceholder(placeholder) if placeholder.worktree.is_main => {
                self.message = Some("The main working tree cannot be removed".to_string());
                return;
            }
            Node::InactivePlaceholder(placeholder) => Confirm::RemoveWorktree {
                repo_root: repo_root.clone(),
                path: placeholder.worktree.path.clone(),
            },
            Node::Group(_) => {
                self.message = Some("Select one session of the group to kill it".to_string());
                return;
            }
            Node::Error(_) => return,
        };
        self.confirm = Some(confirm);
        self.input_mode = InputMode::Confirming;
    }

    /// Open the slug prompt for the selected repository, or the only one
    fn start_new_task(&mut self) {
        let repo = match self.selected_row() {
            Some(Row::Item { repo_root, .. }) => self
                .repos
                .iter()
                .find(|(target, _)| target.root == *repo_root)
                .map(|(target, _)| target.clone()),
            _ if self.repos.len() == 1 => Some(self.repos[0].0.clone()),
            _ => None,
        };
        let Some(repo) = repo else {
            self.message = Some("Select a repository first".to_string());
            return;
        };
        self.creating_in = Some(repo);
        self.input_buffer.clear();
        self.input_mode = InputMode::Creating;
    }

    fn request_cleanup(&mut self) {
        let items = task::cleanup_plan(&self.repos, self.captured_at);
        if items.is_empty() {
            self.message = Some("No orphans found".to_string());
            return;
        }
        self.confirm = Some(Confirm::Cleanup(items));
        self.input_mode = InputMode::Confirming;
    }

    fn copy_selected_path(&mut self) {
        let path = match self.selected_node() {
            Some(Node::Session(entry) | Node::Detail(entry)) => entry
                .worktree
                .as_ref()
                .map(|wt| wt.path.clone())
                .or_else(|| entry.workdir.clone()),
            Some(node) => node.path().map(str::to_string),
            None => None,
        };
        match path {
            Some(path) => self.pending_actions.push(Action::CopyPath(path)),
            None => self.message = Some("No path to copy".to_string()),
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Main content
                Constraint::Length(3), // Footer/status
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_main(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);

        match self.input_mode {
            InputMode::Creating => self.render_create_dialog(frame),
            InputMode::Confirming => self.render_confirm_dialog(frame),
            InputMode::Normal => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                " worktree-deck ",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("│ filter: {} ", self.filter),
                Style::default().fg(self.theme.fg),
            ),
            Span::styled(
                format!("│ {} repositories", self.repos.len()),
                Style::default().fg(self.theme.dim),
            ),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(title, area);
    }

    fn render_main(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Tree
                Constraint::Percentage(40), // Detail pane
            ])
            .split(area);

        self.render_tree(frame, chunks[0]);
        self.render_detail_pane(frame, chunks[1]);
    }

    fn glyph_color(&self, node: &Node) -> Color {
        match node {
            Node::Group(_) => self.theme.fg,
            Node::Session(entry) | Node::Detail(entry) => match entry.classification {
                Classification::Attached => self.theme.accent,
                Classification::Alive => self.theme.success,
                Classification::Idle => self.theme.warning,
                Classification::Orphan => self.theme.error,
            },
            Node::InactivePlaceholder(_) => self.theme.dim,
            Node::Error(_) => self.theme.error,
        }
    }

    fn render_tree(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = if self.rows.is_empty() {
            let text = if self.generation.is_none() {
                "  Loading..."
            } else {
                "  No repositories found."
            };
            vec![ListItem::new(Line::from(Span::styled(
                text,
                Style::default().fg(self.theme.dim),
            )))]
        } else {
            self.rows
                .iter()
                .map(|row| match row {
                    Row::Header { repo, nodes } => ListItem::new(Line::from(vec![
                        Span::styled(
                            repo.clone(),
                            Style::default()
                                .fg(self.theme.accent)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(format!(" ({})", nodes), Style::default().fg(self.theme.dim)),
                    ])),
                    Row::Item { node, depth, .. } => {
                        let (glyph, _) = node_state(node);
                        ListItem::new(Line::from(vec![
                            Span::raw("  ".repeat(depth + 1)),
                            Span::styled(
                                format!("{} ", glyph),
                                Style::default().fg(self.glyph_color(node)),
                            ),
                            Span::styled(
                                node.label().to_string(),
                                Style::default().fg(self.theme.fg),
                            ),
                            Span::styled(
                                format!("  {}", node_summary(node, self.captured_at)),
                                Style::default().fg(self.theme.dim),
                            ),
                        ]))
                    }
                })
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Worktrees ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.dim)),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Rgb(50, 50, 50))
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn field<'a>(&self, name: &'a str, value: String) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("{}: ", name), Style::default().fg(self.theme.dim)),
            Span::styled(value, Style::default().fg(self.theme.fg)),
        ])
    }

    fn detail_lines(&self, node: &Node) -> Vec<Line<'_>> {
        let now = self.captured_at;
        let (_, state) = node_state(node);
        let mut lines = vec![self.field("State", state.to_string())];

        match node {
            Node::Session(entry) | Node::Detail(entry) => {
                lines.push(self.field("Session", entry.name.clone()));
                if let Some(path) = entry
                    .worktree
                    .as_ref()
                    .map(|wt| wt.path.clone())
                    .or_else(|| entry.workdir.clone())
                {
                    lines.push(self.field("Path", path));
                }
                if let Some(wt) = &entry.worktree {
                    lines.push(self.field("Branch", branch_label(&wt.branch)));
                }
                lines.push(self.field("Panes", entry.status.pane_count.to_string()));
                lines.push(self.field(
                    "Activity",
                    format_relative_time(entry.status.last_activity, now),
                ));
                if entry.status.git_dirty {
                    lines.push(self.field("Changes", entry_summary(entry, now)));
                }
            }
            Node::Group(group) => {
                lines.push(self.field("Path", group.worktree.path.clone()));
                lines.push(self.field("Branch", branch_label(&group.worktree.branch)));
                lines.push(self.field("Sessions", group.children.len().to_string()));
            }
            Node::InactivePlaceholder(placeholder) => {
                lines.push(self.field("Path", placeholder.worktree.path.clone()));
                lines.push(self.field("Branch", branch_label(&placeholder.worktree.branch)));
                lines.push(self.field("Opens", placeholder.target_session.clone()));
                if let Some(ts) = placeholder.last_modified {
                    lines.push(self.field("Edited", format_relative_time(ts, now)));
                }
                let counts = git_counts(&placeholder.git);
                if !counts.is_empty() {
                    lines.push(self.field("Changes", counts));
                }
            }
            Node::Error(error) => {
                lines.push(self.field("Repository", error.repo.clone()));
                lines.push(Line::from(Span::styled(
                    error.message.clone(),
                    Style::default().fg(self.theme.error),
                )));
            }
        }
        lines
    }

    fn render_detail_pane(&self, frame: &mut Frame, area: Rect) {
        let content = match self.selected_node() {
            Some(node) => self.detail_lines(node),
            None => vec![Line::from(Span::styled(
                "Nothing selected",
                Style::default().fg(self.theme.dim),
            ))],
        };

        let detail = Paragraph::new(content).block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(detail, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let help_text = " q: Quit │ j/k: Navigate │ Enter: Open │ f: Filter │ r: Refresh │ d: Delete │ y: Copy path │ n: New task │ c: Cleanup ";

        let content = if let Some(ref msg) = self.message {
            let ok = ["Copied", "Removed", "Killed", "Cleaned", "Created"]
                .iter()
                .any(|word| msg.contains(word));
            let style = if ok && !msg.contains("failed") {
                Style::default().fg(self.theme.success)
            } else {
                Style::default().fg(self.theme.error)
            };
            Line::from(Span::styled(format!(" {} ", msg), style))
        } else {
            Line::from(Span::styled(help_text, Style::default().fg(self.theme.dim)))
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(footer, area);
    }

    fn render_create_dialog(&self, frame: &mut Frame) {
        let area = centered_rect(50, 20, frame.area());

        frame.render_widget(Clear, area);

        let repo = self
            .creating_in
            .as_ref()
            .map(|target| target.name.as_str())
            .unwrap_or_default();
        let block = Block::default()
            .title(format!(" New Task in {} ", repo))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Enter task name:",
                Style::default().fg(self.theme.fg),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("▶ {}_", self.input_buffer),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to create, Esc to cancel",
                Style::default().fg(self.theme.dim),
            )),
        ];

        let paragraph = Paragraph::new(text);
        frame.render_widget(paragraph, inner);
    }

    fn render_confirm_dialog(&self, frame: &mut Frame) {
        let height = match &self.confirm {
            Some(Confirm::Cleanup(_)) => 50,
            _ => 20,
        };
        let area = centered_rect(50, height, frame.area());

        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Confirm Delete ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.error));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let question = match &self.confirm {
            Some(Confirm::KillSession(name)) => format!("Kill session '{}'?", name),
            Some(Confirm::RemoveWorktree { path, .. }) => format!("Remove worktree '{}'?", path),
            Some(Confirm::Cleanup(items)) => format!("Clean up {} item(s)?", items.len()),
            None => String::new(),
        };

        let mut text = vec![
            Line::from(""),
            Line::from(Span::styled(question, Style::default().fg(self.theme.fg))),
        ];
        if let Some(Confirm::Cleanup(items)) = &self.confirm {
            text.extend(items.iter().map(|item| {
                Line::from(Span::styled(
                    format!("  {}", item),
                    Style::default().fg(self.theme.dim),
                ))
            }));
        }
        text.extend([
            Line::from(""),
            Line::from(Span::styled(
                "This action cannot be undone.",
                Style::default().fg(self.theme.warning),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press 'y' to confirm, 'n' or Esc to cancel",
                Style::default().fg(self.theme.dim),
            )),
        ]);

        let paragraph = Paragraph::new(text);
        frame.render_widget(paragraph, inner);
    }
}

fn branch_label(branch: &str) -> String {
    if branch.is_empty() {
        "(detached)".to_string()
    } else {
        branch.to_string()
    }
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
