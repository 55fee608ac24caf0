use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::git::GitClient;
use crate::naming;
use crate::reconcile::{reconcile_or_error, Category, Classification, Node, Snapshot, Timestamp};
use crate::refresh::RepoTarget;
use crate::tmux::TmuxClient;

/// A task worktree with its session, ready to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub slug: String,
    pub session: String,
    pub worktree: PathBuf,
}

/// Create a task: a worktree on `task/<slug>` and a session tagged with it.
///
/// A slug already used by a session, a worktree directory or a branch gets
/// a numeric suffix.
pub async fn create_task(
    tmux: &TmuxClient,
    git: &GitClient,
    repo: &RepoTarget,
    slug: &str,
) -> Result<CreatedTask> {
    let base = git.base_branch(&repo.root).await?;

    let mut final_slug = slug.to_string();
    let mut suffix = 1;
    while slug_taken(tmux, git, repo, &final_slug).await {
        suffix += 1;
        final_slug = format!("{}-{}", slug, suffix);
    }

    let worktree = git.add_worktree(&repo.root, &final_slug, &base).await?;
    let session = naming::session_name(&repo.name, &final_slug);
    tmux.create_session(&session, &worktree.to_string_lossy()).await?;

    info!(repo = %repo.name, slug = %final_slug, %session, %base, "created task");
    Ok(CreatedTask {
        slug: final_slug,
        session,
        worktree,
    })
}

async fn slug_taken(tmux: &TmuxClient, git: &GitClient, repo: &RepoTarget, slug: &str) -> bool {
    naming::task_worktree_path(&repo.root, slug).exists()
        || tmux.has_session(&naming::session_name(&repo.name, slug)).await
        || git.branch_exists(&repo.root, &naming::task_branch(slug)).await
}

/// One leftover found by the orphan sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupItem {
    /// A session whose working tree is gone
    KillSession { name: String },
    /// A task worktree nobody has a session in; `dirty` trees are removed by force
    RemoveWorktree {
        repo_root: PathBuf,
        path: String,
        dirty: bool,
    },
}

impl fmt::Display for CleanupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupItem::KillSession { name } => write!(f, "kill session {}", name),
            CleanupItem::RemoveWorktree { path, dirty: true, .. } => {
                write!(f, "force-remove {} (uncommitted changes)", path)
            }
            CleanupItem::RemoveWorktree { path, .. } => write!(f, "remove {}", path),
        }
    }
}

/// Orphan sessions and sessionless task worktrees across every repository.
///
/// Only trees under the worktrees directory are candidates; the main tree
/// and trees elsewhere are left alone. Failed repositories contribute nothing.
pub fn cleanup_plan(repos: &[(RepoTarget, Snapshot)], now: Timestamp) -> Vec<CleanupItem> {
    let task_dir = format!("/{}/", naming::WORKTREES_DIR);
    let mut plan = Vec::new();

    for (target, snapshot) in repos {
        for node in reconcile_or_error(snapshot, Category::All, now) {
            match node {
                Node::Session(entry) if entry.classification == Classification::Orphan => {
                    plan.push(CleanupItem::KillSession { name: entry.name });
                }
                Node::InactivePlaceholder(placeholder)
                    if !placeholder.worktree.is_main
                        && placeholder.worktree.path.replace('\\', "/").contains(&task_dir) =>
                {
                    plan.push(CleanupItem::RemoveWorktree {
                        repo_root: target.root.clone(),
                        dirty: placeholder.git.is_dirty(),
                        path: placeholder.worktree.path,
                    });
                }
                _ => {}
            }
        }
    }

    plan
}

/// Carry out a sweep; returns how many items succeeded and the failures
pub async fn run_cleanup(
    tmux: &TmuxClient,
    git: &GitClient,
    items: &[CleanupItem],
) -> (usize, Vec<String>) {
    let mut done = 0;
    let mut failures = Vec::new();

    for item in items {
        let result = match item {
            CleanupItem::KillSession { name } => tmux.kill_session(name).await,
            CleanupItem::RemoveWorktree {
                repo_root,
                path,
                dirty,
            } => git.remove_worktree(repo_root, path, *dirty).await,
        };
        match result {
            Ok(()) => done += 1,
            Err(e) => {
                warn!(%item, "cleanup step failed: {:#}", e);
                failures.push(format!("{}: {}", item, e));
            }
        }
    }

    (done, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Source, SourceError};
    use crate::reconcile::{GitStatusFact, SessionFact, WorktreeFact};

    const T: Timestamp = 1_700_000_000;

    fn worktree(path: &str, is_main: bool) -> WorktreeFact {
        WorktreeFact {
            path: path.to_string(),
            branch: String::new(),
            head: String::new(),
            is_main,
            prunable: false,
        }
    }

    fn target() -> RepoTarget {
        RepoTarget {
            root: PathBuf::from("/r"),
            name: "proj".to_string(),
        }
    }

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![
            SessionFact {
                name: "proj_old".to_string(),
                attached: true,
                last_activity: T,
                pane_count: 1,
                workdir: Some("/gone".to_string()),
            },
            SessionFact {
                name: "proj_live".to_string(),
                attached: false,
                last_activity: T,
                pane_count: 1,
                workdir: Some("/r/.worktrees/live".to_string()),
            },
        ]);
        snapshot.worktrees = Ok(vec![
            worktree("/r", true),
            worktree("/r/.worktrees/live", false),
            worktree("/r/.worktrees/clean", false),
            worktree("/r/.worktrees/dirty", false),
            worktree("/elsewhere/checkout", false),
        ]);
        snapshot.git_statuses.insert(
            "/r/.worktrees/dirty".to_string(),
            GitStatusFact {
                modified: 1,
                ..GitStatusFact::default()
            },
        );
        snapshot
    }

    #[test]
    fn test_cleanup_plan_picks_orphans_and_idle_task_trees() {
        let plan = cleanup_plan(&[(target(), snapshot())], T);
        assert_eq!(
            plan,
            vec![
                CleanupItem::RemoveWorktree {
                    repo_root: PathBuf::from("/r"),
                    path: "/r/.worktrees/clean".to_string(),
                    dirty: false,
                },
                CleanupItem::RemoveWorktree {
                    repo_root: PathBuf::from("/r"),
                    path: "/r/.worktrees/dirty".to_string(),
                    dirty: true,
                },
                CleanupItem::KillSession {
                    name: "proj_old".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_cleanup_plan_skips_failed_repos() {
        let mut broken = snapshot();
        broken.sessions = Err(SourceError::unavailable(Source::Tmux, "socket refused"));
        assert!(cleanup_plan(&[(target(), broken)], T).is_empty());
    }

    #[test]
    fn test_cleanup_item_describes_forced_removal() {
        let item = CleanupItem::RemoveWorktree {
            repo_root: PathBuf::from("/r"),
            path: "/r/.worktrees/dirty".to_string(),
            dirty: true,
        };
        assert_eq!(
            item.to_string(),
            "force-remove /r/.worktrees/dirty (uncommitted changes)"
        );
    }
}
