use std::collections::HashMap;

use tracing::{debug, warn};

use super::model::{SessionFact, WorktreeFact};

/// Key prefix of the association holding a session with no known working tree
pub const ORPHAN_KEY_PREFIX: &str = "orphan:";

/// Sessions and the working tree they share, keyed by normalized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub key: String,
    pub worktree: Option<WorktreeFact>,
    pub sessions: Vec<SessionFact>,
}

#[cfg(test)]
impl Association {
    /// Sessions here point at no known working tree
    pub fn is_orphan(&self) -> bool {
        self.worktree.is_none()
    }
}

/// Normalize a path for comparison without touching the filesystem.
///
/// Returns `None` for empty or relative paths.
pub fn normalize_path(raw: &str) -> Option<String> {
    let unified = raw.trim().replace('\\', "/");

    let (root, rest) = match unified.as_bytes() {
        [drive, b':', b'/', ..] if drive.is_ascii_alphabetic() => {
            (unified[..2].to_ascii_uppercase(), &unified[2..])
        }
        [b'/', ..] => (String::new(), unified.as_str()),
        _ => return None,
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in rest.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    Some(format!("{}/{}", root, parts.join("/")))
}

/// Build the association table for one repository.
///
/// Every session and every non-prunable worktree lands in exactly one
/// association. Worktree associations come first in path order, orphan
/// associations follow in session input order.
pub fn associate(sessions: &[SessionFact], worktrees: &[WorktreeFact]) -> Vec<Association> {
    let mut seeded: Vec<(String, WorktreeFact)> = Vec::new();
    for worktree in worktrees.iter().filter(|wt| !wt.prunable) {
        let Some(key) = normalize_path(&worktree.path) else {
            warn!(path = %worktree.path, "skipping worktree with unresolvable path");
            continue;
        };
        if seeded.iter().any(|(existing, _)| *existing == key) {
            warn!(path = %worktree.path, "duplicate worktree path, keeping first entry");
            continue;
        }
        seeded.push((key, worktree.clone()));
    }
    seeded.sort_by(|a, b| a.0.cmp(&b.0));

    let mut associations: Vec<Association> = seeded
        .into_iter()
        .map(|(key, worktree)| Association {
            key,
            worktree: Some(worktree),
            sessions: Vec::new(),
        })
        .collect();

    let mut index: HashMap<String, usize> = associations
        .iter()
        .enumerate()
        .map(|(i, assoc)| (assoc.key.clone(), i))
        .collect();

    for session in sessions {
        let resolved = session.workdir.as_deref().and_then(normalize_path);

        let key = match resolved {
            Some(path) if index.contains_key(&path) => path,
            other => {
                debug!(
                    session = %session.name,
                    workdir = ?other,
                    "session has no matching worktree"
                );
                format!("{}{}", ORPHAN_KEY_PREFIX, session.name)
            }
        };

        match index.get(&key) {
            Some(&i) => associations[i].sessions.push(session.clone()),
            None => {
                index.insert(key.clone(), associations.len());
                associations.push(Association {
                    key,
                    worktree: None,
                    sessions: vec![session.clone()],
                });
            }
        }
    }

    associations
}
