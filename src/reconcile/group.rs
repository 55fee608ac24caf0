use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::associate::{normalize_path, Association};
use super::classify::classify;
use super::model::{
    Classification, GitStatusFact, GroupNode, Node, PlaceholderNode, SessionEntry, SessionFact,
    Timestamp, WorktreeFact,
};
use super::status::evaluate;
use crate::naming;

/// Per-path facts the node builder looks up, keyed by normalized path
#[derive(Debug, Default)]
pub struct PathFacts {
    pub git: HashMap<String, GitStatusFact>,
    pub last_modified: HashMap<String, Timestamp>,
}

impl PathFacts {
    /// Re-key raw per-path maps by normalized path
    pub fn from_raw(
        git: &HashMap<String, GitStatusFact>,
        last_modified: &HashMap<String, Timestamp>,
    ) -> Self {
        Self {
            git: git
                .iter()
                .filter_map(|(path, fact)| normalize_path(path).map(|key| (key, *fact)))
                .collect(),
            last_modified: last_modified
                .iter()
                .filter_map(|(path, ts)| normalize_path(path).map(|key| (key, *ts)))
                .collect(),
        }
    }
}

/// Turn each association into presentation nodes.
///
/// Placeholder target names never collide with a session seen in this pass
/// or with another placeholder's target.
pub fn build_nodes(
    associations: Vec<Association>,
    repo_name: &str,
    facts: &PathFacts,
    now: Timestamp,
) -> Vec<Node> {
    let mut taken: HashSet<String> = associations
        .iter()
        .flat_map(|assoc| assoc.sessions.iter().map(|s| s.name.clone()))
        .collect();

    associations
        .into_iter()
        .flat_map(|assoc| build_node(assoc, repo_name, facts, now, &mut taken))
        .collect()
}

fn build_node(
    assoc: Association,
    repo_name: &str,
    facts: &PathFacts,
    now: Timestamp,
    taken: &mut HashSet<String>,
) -> Vec<Node> {
    let Association {
        key,
        worktree,
        sessions,
    } = assoc;

    let git = facts.git.get(&key);

    let Some(worktree) = worktree else {
        // Orphans are never grouped, one node per session
        return sessions
            .iter()
            .map(|session| Node::Session(entry(&key, session, None, None, repo_name, now)))
            .collect();
    };

    let label = naming::slug_from_worktree(&worktree.path, repo_name, worktree.is_main);

    let node = match sessions.len() {
        0 => {
            let base = naming::session_name(repo_name, &label);
            let target_session = naming::disambiguate(&base, |name| taken.contains(name));
            if target_session != base {
                debug!(%base, %target_session, "placeholder target already in use");
            }
            taken.insert(target_session.clone());
            Node::InactivePlaceholder(PlaceholderNode {
                target_session,
                last_modified: facts.last_modified.get(&key).copied(),
                git: git.copied().unwrap_or_default(),
                key,
                label,
                worktree,
            })
        }
        1 => Node::Session(entry(&key, &sessions[0], Some(&worktree), git, repo_name, now)),
        _ => {
            let mut children: Vec<SessionEntry> = sessions
                .iter()
                .map(|session| entry(&key, session, Some(&worktree), git, repo_name, now))
                .collect();
            children.sort_by(|a, b| {
                a.classification
                    .priority()
                    .cmp(&b.classification.priority())
                    .then_with(|| a.name.cmp(&b.name))
            });
            Node::Group(GroupNode {
                key,
                label,
                worktree,
                children,
            })
        }
    };

    vec![node]
}

fn entry(
    key: &str,
    session: &SessionFact,
    worktree: Option<&WorktreeFact>,
    git: Option<&GitStatusFact>,
    repo_name: &str,
    now: Timestamp,
) -> SessionEntry {
    let status = evaluate(session, git);
    let classification = match worktree {
        Some(_) => classify(&status, now),
        None => Classification::Orphan,
    };

    SessionEntry {
        key: key.to_string(),
        name: session.name.clone(),
        slug: naming::slug_from_session(&session.name, repo_name),
        workdir: match worktree {
            Some(wt) => Some(wt.path.clone()),
            None => session.workdir.clone(),
        },
        worktree: worktree.cloned(),
        status,
        classification,
    }
}

/// Drop inactive placeholders whose path is already covered by an active node.
///
/// Nodes without a path pass through untouched.
pub fn dedup_by_path(nodes: Vec<Node>) -> Vec<Node> {
    let active_paths: HashSet<String> = nodes
        .iter()
        .filter(|node| node.is_active())
        .filter_map(|node| node.path().and_then(normalize_path))
        .collect();

    nodes
        .into_iter()
        .filter(|node| match node {
            Node::InactivePlaceholder(placeholder) => {
                let shadowed = normalize_path(&placeholder.worktree.path)
                    .map(|p| active_paths.contains(&p))
                    .unwrap_or(false);
                if shadowed {
                    debug!(path = %placeholder.worktree.path, "active node shadows placeholder");
                }
                !shadowed
            }
            _ => true,
        })
        .collect()
}
