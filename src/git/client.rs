use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Source, SourceError};
use crate::naming;
use crate::reconcile::{GitStatusFact, WorktreeFact};

/// Upper bound on a single `git status` run
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for interacting with git via CLI
#[derive(Clone)]
pub struct GitClient {
    /// Path to git binary
    git_path: String,
}

impl GitClient {
    pub fn new() -> Self {
        Self {
            git_path: "git".to_string(),
        }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, SourceError> {
        let output = Command::new(&self.git_path)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SourceError::unavailable(Source::Git, format!("failed to run git in {}: {}", dir.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::unavailable(
                Source::Git,
                format!("git {} failed: {}", args.join(" "), stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Top-level directory of the repository containing `path`
    pub async fn repo_root(&self, path: &Path) -> Result<PathBuf, SourceError> {
        let stdout = self.run(path, &["rev-parse", "--show-toplevel"]).await?;
        let root = stdout.trim();
        if root.is_empty() {
            return Err(SourceError::malformed(Source::Git, "empty repository root"));
        }
        Ok(PathBuf::from(root))
    }

    /// List every working tree of the repository, prunable ones included
    pub async fn list_worktrees(&self, repo_root: &Path) -> Result<Vec<WorktreeFact>, SourceError> {
        let stdout = self
            .run(repo_root, &["worktree", "list", "--porcelain"])
            .await?;
        let worktrees = parse_worktree_porcelain(&stdout);
        debug!(repo = %repo_root.display(), count = worktrees.len(), "listed worktrees");
        Ok(worktrees)
    }

    /// Change counts for one working tree
    pub async fn status(&self, worktree: &str) -> Result<GitStatusFact, SourceError> {
        let dir = Path::new(worktree);
        if !dir.is_dir() {
            return Err(SourceError::unavailable(
                Source::Git,
                format!("{} does not exist", worktree),
            ));
        }

        let stdout = tokio::time::timeout(STATUS_TIMEOUT, self.run(dir, &["status", "--porcelain"]))
            .await
            .map_err(|_| {
                SourceError::unavailable(Source::Git, format!("git status timed out in {}", worktree))
            })??;

        Ok(parse_status_porcelain(&stdout))
    }

    /// Branch new task worktrees start from.
    ///
    /// The remote's default branch when one is known, else the current branch.
    pub async fn base_branch(&self, repo_root: &Path) -> Result<String> {
        if let Ok(remote_head) = self
            .run(
                repo_root,
                &["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"],
            )
            .await
        {
            let remote_head = remote_head.trim();
            if !remote_head.is_empty() {
                return Ok(remote_head.to_string());
            }
        }

        let current = self
            .run(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .context("Failed to determine the current branch")?;
        Ok(current.trim().to_string())
    }

    /// Check whether a local branch exists
    pub async fn branch_exists(&self, repo_root: &Path, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        self.run(repo_root, &["show-ref", "--verify", "--quiet", &reference])
            .await
            .is_ok()
    }

    /// Create the worktree of a task on a fresh `task/<slug>` branch
    pub async fn add_worktree(&self, repo_root: &Path, slug: &str, base: &str) -> Result<PathBuf> {
        let path = naming::task_worktree_path(repo_root, slug);
        let branch = naming::task_branch(slug);
        let path_arg = path.to_string_lossy();

        let output = Command::new(&self.git_path)
            .args(["worktree", "add", "-b", branch.as_str(), &*path_arg, base])
            .current_dir(repo_root)
            .output()
            .await
            .context("Failed to run git worktree add")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to add worktree: {}", stderr.trim());
        }

        info!(worktree = %path.display(), %branch, base, "added worktree");
        Ok(path)
    }

    /// Remove a working tree. Without `force` git refuses when it has local changes.
    pub async fn remove_worktree(&self, repo_root: &Path, worktree: &str, force: bool) -> Result<()> {
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(worktree);

        let output = Command::new(&self.git_path)
            .args(&args)
            .current_dir(repo_root)
            .output()
            .await
            .context("Failed to run git worktree remove")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to remove worktree: {}", stderr.trim());
        }

        info!(worktree, force, "removed worktree");
        Ok(())
    }
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `git worktree list --porcelain`.
///
/// The first entry is the primary working tree. Bare entries have no
/// working directory and are skipped.
pub fn parse_worktree_porcelain(output: &str) -> Vec<WorktreeFact> {
    let mut worktrees = Vec::new();

    for (index, block) in output
        .split("\n\n")
        .filter(|b| !b.trim().is_empty())
        .enumerate()
    {
        let mut path = None;
        let mut branch = String::new();
        let mut head = String::new();
        let mut prunable = false;
        let mut bare = false;

        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("worktree ") {
                path = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("branch ") {
                branch = rest.strip_prefix("refs/heads/").unwrap_or(rest).to_string();
            } else if let Some(rest) = line.strip_prefix("HEAD ") {
                head = rest.to_string();
            } else if line == "prunable" || line.starts_with("prunable ") {
                prunable = true;
            } else if line == "bare" {
                bare = true;
            }
        }

        let Some(path) = path else { continue };
        if bare {
            continue;
        }

        worktrees.push(WorktreeFact {
            path,
            branch,
            head,
            is_main: index == 0,
            prunable,
        });
    }

    worktrees
}

/// Parse `git status --porcelain` into change counts.
///
/// Renames and conflicts count as modifications; untracked files are not counted.
pub fn parse_status_porcelain(output: &str) -> GitStatusFact {
    let mut status = GitStatusFact::default();

    for line in output.lines() {
        let bytes = line.as_bytes();
        if bytes.len() < 2 {
            continue;
        }
        let (x, y) = (bytes[0], bytes[1]);

        match (x, y) {
            (b'?', b'?') => {}
            (b'A', _) | (_, b'A') => status.added += 1,
            (b'M', _) | (_, b'M') => status.modified += 1,
            (b'D', _) | (_, b'D') => status.deleted += 1,
            (b'R', _) | (b'U', b'U') => status.modified += 1,
            _ => {}
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORCELAIN: &str = "\
worktree /src/proj
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main

worktree /src/proj/.worktrees/auth
HEAD 2222222222222222222222222222222222222222
branch refs/heads/task/auth

worktree /src/proj/.worktrees/scratch
HEAD 3333333333333333333333333333333333333333
detached

worktree /src/proj/.worktrees/gone
HEAD 4444444444444444444444444444444444444444
branch refs/heads/task/gone
prunable gitdir file points to non-existent location
";

    #[test]
    fn test_parse_worktree_porcelain() {
        let worktrees = parse_worktree_porcelain(PORCELAIN);
        assert_eq!(worktrees.len(), 4);

        assert_eq!(worktrees[0].path, "/src/proj");
        assert_eq!(worktrees[0].branch, "main");
        assert!(worktrees[0].is_main);

        assert_eq!(worktrees[1].branch, "task/auth");
        assert!(!worktrees[1].is_main);

        assert_eq!(worktrees[2].branch, "");
        assert_eq!(worktrees[2].head, "3333333333333333333333333333333333333333");

        assert!(worktrees[3].prunable);
        assert!(!worktrees[2].prunable);
    }

    #[test]
    fn test_parse_worktree_porcelain_skips_bare() {
        let output = "worktree /src/proj.git\nbare\n\nworktree /src/proj-wt\nHEAD abc\nbranch refs/heads/x\n";
        let worktrees = parse_worktree_porcelain(output);
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].path, "/src/proj-wt");
        assert!(!worktrees[0].is_main);
    }

    #[test]
    fn test_parse_status_porcelain() {
        let output = " M src/lib.rs\nM  Cargo.toml\nA  new.rs\n D old.rs\nR  a.rs -> b.rs\nUU conflict.rs\n?? scratch.txt\n";
        let status = parse_status_porcelain(output);
        assert_eq!(status.modified, 4);
        assert_eq!(status.added, 1);
        assert_eq!(status.deleted, 1);
        assert!(status.is_dirty());
    }

    #[test]
    fn test_parse_status_clean() {
        assert!(!parse_status_porcelain("").is_dirty());
        assert!(!parse_status_porcelain("?? only-untracked\n").is_dirty());
    }

    #[tokio::test]
    async fn test_base_branch_outside_repo_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let client = GitClient::new();
        assert!(client.base_branch(tmp.path()).await.is_err());
        assert!(!client.branch_exists(tmp.path(), "task/x").await);
    }

    #[tokio::test]
    async fn test_status_of_missing_tree_is_unavailable() {
        let client = GitClient::new();
        let err = client.status("/nonexistent/worktree/path").await.unwrap_err();
        assert_eq!(err.source_kind(), Source::Git);
    }
}
