use ignore::WalkBuilder;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::reconcile::Timestamp;

/// Directories that never say anything about recent work
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "target",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
];

/// Most recent file modification in a working tree.
///
/// Looks at files in the root and one level of subdirectories, honouring
/// `.gitignore`. Returns `None` when nothing readable was found.
pub fn last_modified(root: &Path) -> Option<Timestamp> {
    let walker = WalkBuilder::new(root)
        .max_depth(Some(2))
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir
                && entry.depth() > 0
                && EXCLUDED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref()))
        })
        .build();

    walker
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.metadata().ok()?.modified().ok())
        .filter_map(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as Timestamp)
        .max()
}
