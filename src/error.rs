use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// External source a fact set was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Tmux,
    Git,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Tmux => f.write_str("tmux"),
            Source::Git => f.write_str("git"),
        }
    }
}

/// Failure of an adapter to produce facts
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be queried at all
    #[error("{origin} unavailable: {reason}")]
    Unavailable { origin: Source, reason: String },

    /// The source answered but the output made no sense
    #[error("{origin} returned malformed output: {reason}")]
    Malformed { origin: Source, reason: String },
}

impl SourceError {
    pub fn unavailable(source: Source, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            origin: source,
            reason: reason.into(),
        }
    }

    pub fn malformed(source: Source, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            origin: source,
            reason: reason.into(),
        }
    }

    pub fn source_kind(&self) -> Source {
        match self {
            SourceError::Unavailable { origin, .. } | SourceError::Malformed { origin, .. } => {
                *origin
            }
        }
    }
}

/// Repository-level failure of a reconciliation pass
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("could not list {origin} state for {repo}: {reason}")]
    SourceUnavailable {
        repo: String,
        origin: Source,
        reason: String,
    },
}

impl ReconcileError {
    pub fn from_source(repo: &str, err: &SourceError) -> Self {
        let reason = match err {
            SourceError::Unavailable { reason, .. } | SourceError::Malformed { reason, .. } => {
                reason.clone()
            }
        };
        ReconcileError::SourceUnavailable {
            repo: repo.to_string(),
            origin: err.source_kind(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_error_names_repo_and_source() {
        let err = SourceError::unavailable(Source::Git, "not a git repository");
        let reconcile = ReconcileError::from_source("proj", &err);
        assert_eq!(
            reconcile.to_string(),
            "could not list git state for proj: not a git repository"
        );
    }
}
