use super::model::{GitStatusFact, SessionFact, SessionStatus};

/// Compute the runtime status of a session.
///
/// Git counts are zero when no status is known for the session's tree,
/// including when the tree no longer exists on disk.
pub fn evaluate(session: &SessionFact, git: Option<&GitStatusFact>) -> SessionStatus {
    let git = git.copied().unwrap_or_default();

    SessionStatus {
        attached: session.attached,
        pane_count: session.pane_count.max(1),
        last_activity: session.last_activity,
        git_dirty: git.is_dirty(),
        git_modified: git.modified,
        git_added: git.added,
        git_deleted: git.deleted,
    }
}
