use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// A live tmux session as reported by the multiplexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFact {
    /// Session name, unique per tmux server
    pub name: String,
    /// Whether at least one client is attached
    pub attached: bool,
    /// Last activity time, 0 when unknown
    pub last_activity: Timestamp,
    /// Number of panes across all windows
    pub pane_count: u32,
    /// Working directory tag; may be stale or point at a deleted path
    pub workdir: Option<String>,
}

/// A git working tree as reported by `git worktree list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeFact {
    pub path: String,
    /// Branch name without `refs/heads/`, empty when detached
    pub branch: String,
    pub head: String,
    /// True for the repository's primary working tree
    pub is_main: bool,
    pub prunable: bool,
}

/// Change counts from `git status` for one working tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatusFact {
    pub modified: u32,
    pub added: u32,
    pub deleted: u32,
}

impl GitStatusFact {
    pub fn is_dirty(&self) -> bool {
        self.modified + self.added + self.deleted > 0
    }
}

/// Runtime status of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub attached: bool,
    pub pane_count: u32,
    pub last_activity: Timestamp,
    pub git_dirty: bool,
    pub git_modified: u32,
    pub git_added: u32,
    pub git_deleted: u32,
}

/// Activity label of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Attached,
    Alive,
    Idle,
    Orphan,
}

/// Priority of a worktree with no session. Sits between idle and orphan.
pub const STOPPED_PRIORITY: u8 = 4;

impl Classification {
    /// Sort priority, lower sorts first
    pub const fn priority(self) -> u8 {
        match self {
            Classification::Attached => 1,
            Classification::Alive => 2,
            Classification::Idle => 3,
            Classification::Orphan => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Classification::Attached => "attached",
            Classification::Alive => "alive",
            Classification::Idle => "idle",
            Classification::Orphan => "orphan",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category selector narrowing the emitted node list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Attached,
    Alive,
    Idle,
    Stopped,
    Orphans,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::All,
        Category::Attached,
        Category::Alive,
        Category::Idle,
        Category::Stopped,
        Category::Orphans,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Attached => "attached",
            Category::Alive => "alive",
            Category::Idle => "idle",
            Category::Stopped => "stopped",
            Category::Orphans => "orphans",
        }
    }

    /// Next category in display order, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Whether a session with the given classification falls in this category
    pub fn admits(self, classification: Classification) -> bool {
        matches!(
            (self, classification),
            (Category::All, _)
                | (Category::Attached, Classification::Attached)
                | (Category::Alive, Classification::Alive)
                | (Category::Idle, Classification::Idle)
                | (Category::Orphans, Classification::Orphan)
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown filter '{}'", s))
    }
}

/// One classified session inside the merged view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    /// Key of the association the session was placed in
    pub key: String,
    pub name: String,
    pub slug: String,
    /// Matched worktree path, or the raw tag for orphans
    pub workdir: Option<String>,
    pub worktree: Option<WorktreeFact>,
    pub status: SessionStatus,
    pub classification: Classification,
}

/// Several sessions declaring the same working tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub key: String,
    pub label: String,
    pub worktree: WorktreeFact,
    pub children: Vec<SessionEntry>,
}

/// A working tree with no session; the session is created on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderNode {
    pub key: String,
    pub label: String,
    pub worktree: WorktreeFact,
    /// Session name to create when the tree is opened
    pub target_session: String,
    pub git: GitStatusFact,
    /// Most recent file modification inside the tree, display only
    pub last_modified: Option<Timestamp>,
}

/// Repository-level failure shown in place of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNode {
    pub repo: String,
    pub message: String,
}

/// Presentation node handed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Group(GroupNode),
    Session(SessionEntry),
    /// A session listed under a group
    Detail(SessionEntry),
    InactivePlaceholder(PlaceholderNode),
    Error(ErrorNode),
}

impl Node {
    /// Identity of the node within one repository.
    ///
    /// Top-level nodes use their association key. A detail shares that key with
    /// its group, so it is identified by its session name instead.
    pub fn key(&self) -> &str {
        match self {
            Node::Group(group) => &group.key,
            Node::Session(entry) => &entry.key,
            Node::Detail(entry) => &entry.name,
            Node::InactivePlaceholder(placeholder) => &placeholder.key,
            Node::Error(error) => &error.repo,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Node::Group(group) => &group.label,
            Node::Session(entry) | Node::Detail(entry) => &entry.slug,
            Node::InactivePlaceholder(placeholder) => &placeholder.label,
            Node::Error(error) => &error.message,
        }
    }

    /// Working tree path the node stands for, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Node::Group(group) => Some(&group.worktree.path),
            Node::Session(entry) | Node::Detail(entry) => {
                entry.worktree.as_ref().map(|wt| wt.path.as_str())
            }
            Node::InactivePlaceholder(placeholder) => Some(&placeholder.worktree.path),
            Node::Error(_) => None,
        }
    }

    /// Sort priority; a group ranks as its most active child
    pub fn priority(&self) -> u8 {
        match self {
            Node::Group(group) => group
                .children
                .iter()
                .map(|child| child.classification.priority())
                .min()
                .unwrap_or(STOPPED_PRIORITY),
            Node::Session(entry) | Node::Detail(entry) => entry.classification.priority(),
            Node::InactivePlaceholder(_) => STOPPED_PRIORITY,
            Node::Error(_) => 0,
        }
    }

    /// Active nodes carry at least one live session
    pub fn is_active(&self) -> bool {
        matches!(self, Node::Group(_) | Node::Session(_) | Node::Detail(_))
    }

    pub fn matches(&self, filter: Category) -> bool {
        match (self, filter) {
            (_, Category::All) => true,
            (Node::Error(_), _) => true,
            (Node::InactivePlaceholder(_), Category::Stopped) => true,
            (Node::InactivePlaceholder(_), _) => false,
            (Node::Group(_), Category::Stopped) => false,
            (Node::Group(group), _) => group
                .children
                .iter()
                .any(|child| filter.admits(child.classification)),
            (Node::Session(entry) | Node::Detail(entry), _) => filter.admits(entry.classification),
        }
    }

    /// Children of a group, as detail nodes
    pub fn children(&self) -> Vec<Node> {
        match self {
            Node::Group(group) => group.children.iter().cloned().map(Node::Detail).collect(),
            _ => Vec::new(),
        }
    }

    /// Session to attach to when the node is opened, with the directory to start it in
    pub fn attach_target(&self) -> Option<(&str, Option<&str>)> {
        match self {
            Node::Session(entry) | Node::Detail(entry) => {
                Some((entry.name.as_str(), entry.workdir.as_deref()))
            }
            Node::Group(group) => group
                .children
                .first()
                .map(|child| (child.name.as_str(), Some(group.worktree.path.as_str()))),
            Node::InactivePlaceholder(placeholder) => Some((
                placeholder.target_session.as_str(),
                Some(placeholder.worktree.path.as_str()),
            )),
            Node::Error(_) => None,
        }
    }
}
