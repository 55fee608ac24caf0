use anyhow::{Context, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Source, SourceError};
use crate::reconcile::SessionFact;

/// tmux option holding the working tree a session was created for
pub const WORKDIR_OPTION: &str = "@workdir";

// Format: session_name\tsession_attached\tsession_activity\tsession_path\t@workdir
const SESSION_FORMAT: &str =
    "#{session_name}\t#{session_attached}\t#{session_activity}\t#{session_path}\t#{@workdir}";

/// Client for interacting with tmux via CLI
#[derive(Clone)]
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
        }
    }

    /// List the sessions whose names start with `prefix`.
    ///
    /// A missing tmux server is not an error: it simply has no sessions.
    pub async fn list_session_facts(&self, prefix: &str) -> Result<Vec<SessionFact>, SourceError> {
        let Some(sessions) = self.run_listing(&["list-sessions", "-F", SESSION_FORMAT]).await? else {
            return Ok(Vec::new());
        };
        let panes = self
            .run_listing(&["list-panes", "-a", "-F", "#{session_name}"])
            .await?
            .unwrap_or_default();

        let pane_counts = count_panes(&panes);
        let facts: Vec<SessionFact> = sessions
            .lines()
            .filter_map(parse_session_line)
            .filter(|fact| fact.name.starts_with(prefix))
            .map(|mut fact| {
                if let Some(count) = pane_counts.get(&fact.name) {
                    fact.pane_count = *count;
                }
                fact
            })
            .collect();

        debug!(prefix, count = facts.len(), "listed tmux sessions");
        Ok(facts)
    }

    /// Run a read-only tmux command, `None` when no server is running
    async fn run_listing(&self, args: &[&str]) -> Result<Option<String>, SourceError> {
        let output = Command::new(&self.tmux_path)
            .args(args)
            .output()
            .await
            .map_err(|e| SourceError::unavailable(Source::Tmux, format!("failed to run tmux: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_no_server(&stderr) {
                return Ok(None);
            }
            return Err(SourceError::unavailable(
                Source::Tmux,
                format!("tmux {} failed: {}", args[0], stderr.trim()),
            ));
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    /// Check whether a session with this exact name exists
    pub async fn has_session(&self, name: &str) -> bool {
        Command::new(&self.tmux_path)
            .args(["has-session", "-t", &format!("={}", name)])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Create a detached session rooted at `cwd` and tag it with its working tree
    pub async fn create_session(&self, name: &str, cwd: &str) -> Result<()> {
        let output = Command::new(&self.tmux_path)
            .args(["new-session", "-d", "-s", name, "-c", cwd])
            .output()
            .await
            .context("Failed to create tmux session")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to create session: {}", stderr.trim());
        }

        let output = Command::new(&self.tmux_path)
            .args(["set-option", "-t", name, WORKDIR_OPTION, cwd])
            .output()
            .await
            .context("Failed to tag tmux session")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to set {}: {}", WORKDIR_OPTION, stderr.trim());
        }

        info!(session = name, cwd, "created tmux session");
        Ok(())
    }

    /// Kill a session
    pub async fn kill_session(&self, name: &str) -> Result<()> {
        let output = Command::new(&self.tmux_path)
            .args(["kill-session", "-t", &format!("={}", name)])
            .output()
            .await
            .context("Failed to kill tmux session")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to kill session: {}", stderr.trim());
        }

        info!(session = name, "killed tmux session");
        Ok(())
    }

    /// Get the command to attach to a session (for external execution)
    ///
    /// Inside tmux the current client switches instead of nesting.
    pub fn attach_command(&self, name: &str) -> Vec<String> {
        let verb = if std::env::var_os("TMUX").is_some() {
            "switch-client"
        } else {
            "attach-session"
        };
        vec![
            self.tmux_path.clone(),
            verb.to_string(),
            "-t".to_string(),
            format!("={}", name),
        ]
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running")
        || stderr.contains("no sessions")
        || stderr.contains("error connecting to")
}

/// Parse one `list-sessions` line in [`SESSION_FORMAT`]
pub fn parse_session_line(line: &str) -> Option<SessionFact> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 4 || parts[0].is_empty() {
        return None;
    }

    let name = parts[0].to_string();
    let attached = parts[1].trim().parse::<u32>().unwrap_or(0) > 0;
    let last_activity = parts[2].trim().parse().unwrap_or(0);
    let session_path = parts[3].trim();
    let tag = parts.get(4).map(|s| s.trim()).unwrap_or("");

    // The explicit tag wins; the session's start directory is the fallback
    let workdir = [tag, session_path]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(str::to_string);

    Some(SessionFact {
        name,
        attached,
        last_activity,
        pane_count: 1,
        workdir,
    })
}

/// Count panes per session from `list-panes -a -F #{session_name}`
pub fn count_panes(output: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for name in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    counts
}
