use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::git::GitClient;
use crate::naming;
use crate::reconcile::{GitStatusFact, Snapshot, Timestamp, WorktreeFact};
use crate::recent;
use crate::tmux::TmuxClient;

/// Upper bound on the recency scan of one working tree
const RECENT_SCAN_TIMEOUT: Duration = Duration::from_secs(2);

/// A repository the dashboard tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub root: PathBuf,
    pub name: String,
}

impl RepoTarget {
    pub fn new(root: PathBuf) -> Self {
        let name = naming::repo_name(&root);
        Self { root, name }
    }
}

/// Result of one refresh pass over every tracked repository
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Increases by one per pass; stale passes are discarded by the receiver
    pub generation: u64,
    /// Wall-clock time the pass started, used as `now` when reconciling
    pub captured_at: Timestamp,
    pub repos: Vec<(RepoTarget, Snapshot)>,
}

/// Gathers facts from tmux and git
#[derive(Clone, Default)]
pub struct Refresher {
    tmux: TmuxClient,
    git: GitClient,
}

impl Refresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one pass over all repositories, fetching them concurrently.
    ///
    /// The outcome lists repositories in the order they were given.
    pub async fn refresh(&self, repos: &[RepoTarget], generation: u64) -> RefreshOutcome {
        let captured_at = chrono::Utc::now().timestamp();

        let mut tasks = JoinSet::new();
        for (index, repo) in repos.iter().cloned().enumerate() {
            let refresher = self.clone();
            tasks.spawn(async move {
                let snapshot = refresher.snapshot(&repo).await;
                (index, repo, snapshot)
            });
        }

        let mut fetched = Vec::with_capacity(repos.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => fetched.push(done),
                Err(e) => warn!("repository refresh task failed: {}", e),
            }
        }
        fetched.sort_by_key(|(index, _, _)| *index);
        let out: Vec<(RepoTarget, Snapshot)> = fetched
            .into_iter()
            .map(|(_, repo, snapshot)| (repo, snapshot))
            .collect();
        debug!(generation, repos = out.len(), "refresh pass complete");

        RefreshOutcome {
            generation,
            captured_at,
            repos: out,
        }
    }

    /// Fetch every fact for one repository.
    ///
    /// Sessions and worktrees are listed concurrently; per-tree status and
    /// recency follow once the worktree list is known.
    pub async fn snapshot(&self, repo: &RepoTarget) -> Snapshot {
        let prefix = naming::session_prefix(&repo.name);
        let (sessions, worktrees) = tokio::join!(
            self.tmux.list_session_facts(&prefix),
            self.git.list_worktrees(&repo.root),
        );

        if let Err(e) = &sessions {
            warn!(repo = %repo.name, "session listing failed: {}", e);
        }
        if let Err(e) = &worktrees {
            warn!(repo = %repo.name, "worktree listing failed: {}", e);
        }

        let (git_statuses, last_modified) = match &worktrees {
            Ok(worktrees) => self.path_facts(worktrees).await,
            Err(_) => (HashMap::new(), HashMap::new()),
        };

        Snapshot {
            repo_name: repo.name.clone(),
            sessions,
            worktrees,
            git_statuses,
            last_modified,
        }
    }

    async fn path_facts(
        &self,
        worktrees: &[WorktreeFact],
    ) -> (HashMap<String, GitStatusFact>, HashMap<String, Timestamp>) {
        let mut statuses = JoinSet::new();
        let mut scans = JoinSet::new();

        for worktree in worktrees.iter().filter(|wt| !wt.prunable) {
            let git = self.git.clone();
            let path = worktree.path.clone();
            statuses.spawn(async move {
                let status = git.status(&path).await;
                (path, status)
            });

            let path = worktree.path.clone();
            scans.spawn(async move {
                let root = PathBuf::from(&path);
                let scan = tokio::task::spawn_blocking(move || recent::last_modified(&root));
                let ts = match tokio::time::timeout(RECENT_SCAN_TIMEOUT, scan).await {
                    Ok(Ok(ts)) => ts,
                    Ok(Err(e)) => {
                        warn!(path = %path, "recency scan panicked: {}", e);
                        None
                    }
                    Err(_) => {
                        debug!(path = %path, "recency scan timed out");
                        None
                    }
                };
                (path, ts)
            });
        }

        let mut git_statuses = HashMap::new();
        while let Some(joined) = statuses.join_next().await {
            match joined {
                Ok((path, Ok(status))) => {
                    git_statuses.insert(path, status);
                }
                Ok((path, Err(e))) => debug!(path = %path, "git status unavailable: {}", e),
                Err(e) => warn!("git status task failed: {}", e),
            }
        }

        let mut last_modified = HashMap::new();
        while let Some(joined) = scans.join_next().await {
            match joined {
                Ok((path, Some(ts))) => {
                    last_modified.insert(path, ts);
                }
                Ok((_, None)) => {}
                Err(e) => warn!("recency task failed: {}", e),
            }
        }

        (git_statuses, last_modified)
    }
}

/// Resolve the repository containing `path`
pub async fn resolve_repo(git: &GitClient, path: &Path) -> anyhow::Result<RepoTarget> {
    let root = git.repo_root(path).await?;
    Ok(RepoTarget::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_target_takes_basename() {
        let target = RepoTarget::new(PathBuf::from("/src/my-proj"));
        assert_eq!(target.name, "my-proj");
    }

    #[tokio::test]
    async fn test_refresh_keeps_repository_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let repos = vec![
            RepoTarget::new(first.path().to_path_buf()),
            RepoTarget::new(second.path().to_path_buf()),
        ];

        let outcome = Refresher::new().refresh(&repos, 7).await;
        assert_eq!(outcome.generation, 7);
        let roots: Vec<&Path> = outcome.repos.iter().map(|(r, _)| r.root.as_path()).collect();
        assert_eq!(roots, vec![first.path(), second.path()]);
    }

    #[tokio::test]
    async fn test_snapshot_of_non_repo_carries_git_error() {
        let tmp = tempfile::tempdir().unwrap();
        let target = RepoTarget::new(tmp.path().to_path_buf());

        let snapshot = Refresher::new().snapshot(&target).await;
        assert!(snapshot.worktrees.is_err());
        assert!(snapshot.git_statuses.is_empty());
    }
}
