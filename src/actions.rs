use crossterm::event::KeyEvent;
use std::path::PathBuf;

use crate::refresh::{RefreshOutcome, RepoTarget};
use crate::task::CleanupItem;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// A refresh pass finished
    RefreshCompleted(RefreshOutcome),
    /// Ask the refresh task for an immediate pass
    Refresh,
    /// Attach to a session, creating it at `cwd` first when `create` is set
    AttachSession {
        name: String,
        cwd: Option<String>,
        create: bool,
    },
    /// Kill a session
    KillSession(String),
    /// Remove a working tree
    RemoveWorktree { repo_root: PathBuf, path: String },
    /// Copy a working tree path to the clipboard
    CopyPath(String),
    /// Create a task worktree and session, then attach
    CreateTask { repo: RepoTarget, slug: String },
    /// Kill orphan sessions and remove sessionless task worktrees
    Cleanup(Vec<CleanupItem>),
}
