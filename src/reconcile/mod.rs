//! Merges tmux sessions and git worktrees into one classified, ordered view.
//!
//! Every pass starts from scratch: facts go in, nodes come out, nothing is
//! kept in between. The stages run in order:
//! associate -> build nodes -> dedup -> sort -> filter.

mod associate;
mod classify;
mod group;
mod model;
mod sort;
mod status;
mod time;

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ReconcileError, SourceError};

pub use associate::associate;
pub use group::{build_nodes, dedup_by_path, PathFacts};
pub use model::{
    Category, Classification, ErrorNode, GitStatusFact, Node, SessionEntry, SessionFact,
    Timestamp, WorktreeFact,
};
pub use sort::{apply_filter, sort_nodes};
pub use time::format_relative_time;

/// All facts gathered for one repository during one refresh
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub repo_name: String,
    pub sessions: Result<Vec<SessionFact>, SourceError>,
    pub worktrees: Result<Vec<WorktreeFact>, SourceError>,
    /// Git status per worktree path; absent paths count as clean
    pub git_statuses: HashMap<String, GitStatusFact>,
    /// Latest file modification per worktree path
    pub last_modified: HashMap<String, Timestamp>,
}

#[cfg(test)]
impl Snapshot {
    pub fn new(repo_name: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            sessions: Ok(Vec::new()),
            worktrees: Ok(Vec::new()),
            git_statuses: HashMap::new(),
            last_modified: HashMap::new(),
        }
    }
}

/// Produce the ordered, filtered node list for one repository.
///
/// Fails as a whole when either source listing failed; a partial merge would
/// mislabel sessions as orphans or trees as stopped.
pub fn reconcile(
    snapshot: &Snapshot,
    filter: Category,
    now: Timestamp,
) -> Result<Vec<Node>, ReconcileError> {
    let repo = snapshot.repo_name.as_str();
    let sessions = snapshot
        .sessions
        .as_ref()
        .map_err(|e| ReconcileError::from_source(repo, e))?;
    let worktrees = snapshot
        .worktrees
        .as_ref()
        .map_err(|e| ReconcileError::from_source(repo, e))?;

    let facts = PathFacts::from_raw(&snapshot.git_statuses, &snapshot.last_modified);
    let associations = associate(sessions, worktrees);
    let mut nodes = dedup_by_path(build_nodes(associations, repo, &facts, now));
    sort_nodes(&mut nodes);

    debug!(
        repo,
        sessions = sessions.len(),
        worktrees = worktrees.len(),
        nodes = nodes.len(),
        %filter,
        "reconciled"
    );

    Ok(apply_filter(nodes, filter))
}

impl Node {
    /// Single node standing in for a repository whose pass failed
    pub fn from_error(repo: &str, err: &ReconcileError) -> Self {
        Node::Error(ErrorNode {
            repo: repo.to_string(),
            message: err.to_string(),
        })
    }
}

/// Reconcile, folding a failure into a lone error node
pub fn reconcile_or_error(snapshot: &Snapshot, filter: Category, now: Timestamp) -> Vec<Node> {
    reconcile(snapshot, filter, now)
        .unwrap_or_else(|err| vec![Node::from_error(&snapshot.repo_name, &err)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Source;

    const T: Timestamp = 1_700_000_000;

    fn session(name: &str, attached: bool, last_activity: Timestamp, workdir: &str) -> SessionFact {
        SessionFact {
            name: name.to_string(),
            attached,
            last_activity,
            pane_count: 1,
            workdir: Some(workdir.to_string()),
        }
    }

    fn worktree(path: &str, branch: &str, is_main: bool) -> WorktreeFact {
        WorktreeFact {
            path: path.to_string(),
            branch: branch.to_string(),
            head: String::new(),
            is_main,
            prunable: false,
        }
    }

    fn mixed_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![
            session("proj_main", false, T - 120, "/r"),
            session("proj_api", false, T - 7200, "/r/.worktrees/api"),
            session("proj_api-2", true, T, "/r/.worktrees/api"),
            session("proj_ghost", true, T, "/r/.worktrees/ghost"),
            SessionFact {
                name: "proj_bare".to_string(),
                attached: false,
                last_activity: T,
                pane_count: 2,
                workdir: None,
            },
        ]);
        snapshot.worktrees = Ok(vec![
            worktree("/r", "main", true),
            worktree("/r/.worktrees/api", "task/api", false),
            worktree("/r/.worktrees/docs", "task/docs", false),
            WorktreeFact {
                prunable: true,
                ..worktree("/r/.worktrees/old", "task/old", false)
            },
        ]);
        snapshot
    }

    fn session_names(nodes: &[Node]) -> Vec<String> {
        let mut names: Vec<String> = nodes
            .iter()
            .flat_map(|node| match node {
                Node::Group(group) => group.children.iter().map(|c| c.name.clone()).collect(),
                Node::Session(entry) => vec![entry.name.clone()],
                _ => Vec::new(),
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_attached_tree_and_stale_tag_orphan() {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![
            session("proj_featureA", true, T, "/r/.worktrees/featureA"),
            session("proj_old", false, T - 3600, "/missing"),
        ]);
        snapshot.worktrees = Ok(vec![worktree(
            "/r/.worktrees/featureA",
            "task/featureA",
            false,
        )]);

        let nodes = reconcile(&snapshot, Category::All, T).unwrap();
        assert_eq!(nodes.len(), 2);
        match (&nodes[0], &nodes[1]) {
            (Node::Session(first), Node::Session(second)) => {
                assert_eq!(first.slug, "featureA");
                assert_eq!(first.classification, Classification::Attached);
                assert_eq!(second.name, "proj_old");
                assert_eq!(second.classification, Classification::Orphan);
            }
            other => panic!("unexpected nodes: {:?}", other),
        }
    }

    #[test]
    fn test_every_fact_appears_once() {
        let nodes = reconcile(&mixed_snapshot(), Category::All, T).unwrap();

        assert_eq!(
            session_names(&nodes),
            vec!["proj_api", "proj_api-2", "proj_bare", "proj_ghost", "proj_main"]
        );

        let mut paths: Vec<&str> = nodes
            .iter()
            .filter(|n| !matches!(n, Node::Session(e) if e.worktree.is_none()))
            .filter_map(|n| n.path())
            .collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["/r", "/r/.worktrees/api", "/r/.worktrees/docs"]);
    }

    #[test]
    fn test_mixed_ordering() {
        let nodes = reconcile(&mixed_snapshot(), Category::All, T).unwrap();
        let summary: Vec<(u8, &str)> = nodes.iter().map(|n| (n.priority(), n.label())).collect();
        assert_eq!(
            summary,
            vec![
                (1, "api"),
                (2, "main"),
                (4, "docs"),
                (5, "bare"),
                (5, "ghost"),
            ]
        );
    }

    #[test]
    fn test_orphan_precedence_over_attachment() {
        let nodes = reconcile(&mixed_snapshot(), Category::Orphans, T).unwrap();
        assert_eq!(nodes.len(), 2);
        for node in &nodes {
            let Node::Session(entry) = node else {
                panic!("orphans are single sessions: {:?}", node);
            };
            assert_eq!(entry.classification, Classification::Orphan);
        }
    }

    #[test]
    fn test_attached_session_replaces_placeholder() {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![session("proj_docs", true, T, "/r/.worktrees/docs/")]);
        snapshot.worktrees = Ok(vec![worktree("/r/.worktrees/docs", "task/docs", false)]);

        let nodes = reconcile(&snapshot, Category::All, T).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Session(e) if e.classification == Classification::Attached));
    }

    #[test]
    fn test_identical_input_gives_identical_output() {
        let snapshot = mixed_snapshot();
        let first = serde_json::to_string(&reconcile(&snapshot, Category::All, T).unwrap()).unwrap();
        let second =
            serde_json::to_string(&reconcile(&snapshot, Category::All, T).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_soundness() {
        let snapshot = mixed_snapshot();
        let all = reconcile(&snapshot, Category::All, T).unwrap();

        for filter in Category::ALL {
            let filtered = reconcile(&snapshot, filter, T).unwrap();
            for node in &filtered {
                assert!(all.iter().any(|n| n.key() == node.key()));
                match node {
                    Node::Session(entry) if filter != Category::All => {
                        assert!(filter.admits(entry.classification))
                    }
                    Node::InactivePlaceholder(_) => {
                        assert!(matches!(filter, Category::All | Category::Stopped))
                    }
                    Node::Group(group) if filter != Category::All => {
                        assert_ne!(filter, Category::Stopped);
                        assert!(!group.children.is_empty());
                    }
                    _ => {}
                }
                for child in node.children() {
                    let Node::Detail(entry) = child else {
                        panic!("group children are details");
                    };
                    assert!(filter.admits(entry.classification));
                }
            }
        }
    }

    #[test]
    fn test_alive_filter_drops_idle_group_members() {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![
            session("proj_api", false, T - 10, "/r/.worktrees/api"),
            session("proj_api2", false, T - 7200, "/r/.worktrees/api"),
        ]);
        snapshot.worktrees = Ok(vec![worktree("/r/.worktrees/api", "task/api", false)]);

        let nodes = reconcile(&snapshot, Category::Alive, T).unwrap();
        assert_eq!(nodes.len(), 1);
        let leaves: Vec<(String, Classification)> = nodes[0]
            .children()
            .into_iter()
            .filter_map(|child| match child {
                Node::Detail(entry) => Some((entry.name, entry.classification)),
                _ => None,
            })
            .collect();
        assert_eq!(leaves, vec![("proj_api".to_string(), Classification::Alive)]);

        let all = reconcile(&snapshot, Category::All, T).unwrap();
        assert_eq!(all[0].children().len(), 2);
    }

    #[test]
    fn test_alive_boundary_through_reconcile() {
        let mut snapshot = Snapshot::new("proj");
        snapshot.worktrees = Ok(vec![worktree("/r/.worktrees/a", "task/a", false)]);

        snapshot.sessions = Ok(vec![session("proj_a", false, T - 599, "/r/.worktrees/a")]);
        let nodes = reconcile(&snapshot, Category::Alive, T).unwrap();
        assert_eq!(nodes.len(), 1);

        snapshot.sessions = Ok(vec![session("proj_a", false, T - 600, "/r/.worktrees/a")]);
        let nodes = reconcile(&snapshot, Category::Alive, T).unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_failed_source_fails_whole_repo() {
        let mut snapshot = mixed_snapshot();
        snapshot.worktrees = Err(SourceError::unavailable(Source::Git, "not a git repository"));

        let err = reconcile(&snapshot, Category::All, T).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::SourceUnavailable { origin: Source::Git, .. }
        ));

        let nodes = reconcile_or_error(&snapshot, Category::Orphans, T);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Error(e) if e.repo == "proj"));
    }

    #[test]
    fn test_git_status_keyed_by_raw_path() {
        let mut snapshot = Snapshot::new("proj");
        snapshot.sessions = Ok(vec![session("proj_a", false, T, "/r/.worktrees/a")]);
        snapshot.worktrees = Ok(vec![worktree("/r/.worktrees/a", "task/a", false)]);
        snapshot.git_statuses.insert(
            "/r/.worktrees/a/".to_string(),
            GitStatusFact {
                modified: 0,
                added: 2,
                deleted: 1,
            },
        );

        let nodes = reconcile(&snapshot, Category::All, T).unwrap();
        let Node::Session(entry) = &nodes[0] else {
            panic!("expected session");
        };
        assert!(entry.status.git_dirty);
        assert_eq!((entry.status.git_added, entry.status.git_deleted), (2, 1));
    }
}
