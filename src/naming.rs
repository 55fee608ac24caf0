use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Slug given to a repository's primary working tree
pub const ROOT_SLUG: &str = "main";

/// Directory under the repository root holding task worktrees
pub const WORKTREES_DIR: &str = ".worktrees";

/// Branch namespace for task worktrees
pub const TASK_BRANCH_PREFIX: &str = "task/";

/// tmux rejects `.` and `:` in session names; keep names to a safe alphabet
static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());

static RE_TMUX_RESERVED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.:]").unwrap());

/// Basename of the repository root
pub fn repo_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string())
}

/// Lowercase a name and replace characters tmux cannot carry
pub fn sanitize(name: &str) -> String {
    RE_UNSAFE
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Prefix shared by every session belonging to a repository
pub fn session_prefix(repo_name: &str) -> String {
    format!("{}_", sanitize(repo_name))
}

pub fn session_name(repo_name: &str, slug: &str) -> String {
    format!(
        "{}{}",
        session_prefix(repo_name),
        RE_TMUX_RESERVED.replace_all(slug, "-")
    )
}

/// Turn user input into a task slug; empty when nothing usable remains
pub fn task_slug(input: &str) -> String {
    sanitize(input.trim()).trim_matches('-').to_string()
}

pub fn task_branch(slug: &str) -> String {
    format!("{}{}", TASK_BRANCH_PREFIX, slug)
}

/// Where the worktree of a task lives
pub fn task_worktree_path(repo_root: &Path, slug: &str) -> PathBuf {
    repo_root.join(WORKTREES_DIR).join(slug)
}

/// First of `base`, `base-2`, `base-3`, ... that is not taken
pub fn disambiguate(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Slug of a session: its name without the repository prefix.
///
/// Names outside the repository's prefix are returned unchanged.
pub fn slug_from_session(session_name: &str, repo_name: &str) -> String {
    match session_name.strip_prefix(&session_prefix(repo_name)) {
        Some("") => ROOT_SLUG.to_string(),
        Some(slug) => slug.to_string(),
        None => session_name.to_string(),
    }
}

/// Slug of a working tree, `main` for the repository root itself
pub fn slug_from_worktree(worktree_path: &str, repo_name: &str, is_main: bool) -> String {
    let base = Path::new(worktree_path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    if is_main && !worktree_path.contains(WORKTREES_DIR) {
        return ROOT_SLUG.to_string();
    }

    if base.is_empty() || base == repo_name {
        return ROOT_SLUG.to_string();
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_separators() {
        assert_eq!(sanitize("My.Project"), "my-project");
        assert_eq!(sanitize("api:v2"), "api-v2");
        assert_eq!(sanitize("tmux_worktree-tui"), "tmux_worktree-tui");
    }

    #[test]
    fn test_slug_from_session() {
        assert_eq!(slug_from_session("proj_featureA", "proj"), "featureA");
        assert_eq!(slug_from_session("proj_", "proj"), ROOT_SLUG);
        assert_eq!(slug_from_session("other_x", "proj"), "other_x");
        assert_eq!(slug_from_session("my-app_fix", "My.App"), "fix");
    }

    #[test]
    fn test_slug_from_worktree() {
        assert_eq!(slug_from_worktree("/src/proj", "proj", true), ROOT_SLUG);
        assert_eq!(
            slug_from_worktree("/src/proj/.worktrees/auth", "proj", false),
            "auth"
        );
        assert_eq!(slug_from_worktree("/elsewhere/proj", "proj", false), ROOT_SLUG);
    }

    #[test]
    fn test_session_name_round_trips_through_slug() {
        let name = session_name("proj", "auth");
        assert_eq!(name, "proj_auth");
        assert_eq!(slug_from_session(&name, "proj"), "auth");
        assert_eq!(session_name("proj", "v1.2"), "proj_v1-2");
    }

    #[test]
    fn test_task_slug_and_paths() {
        assert_eq!(task_slug("  Fix Login "), "fix-login");
        assert_eq!(task_slug("--"), "");
        assert_eq!(task_branch("fix-login"), "task/fix-login");
        assert_eq!(
            task_worktree_path(Path::new("/src/proj"), "fix-login"),
            PathBuf::from("/src/proj/.worktrees/fix-login")
        );
    }

    #[test]
    fn test_disambiguate_appends_first_free_suffix() {
        assert_eq!(disambiguate("auth", |_| false), "auth");
        let taken = ["auth", "auth-2"];
        assert_eq!(disambiguate("auth", |c| taken.contains(&c)), "auth-3");
    }
}
