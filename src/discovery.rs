use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Find git repositories under each root, at most `max_depth` levels down.
///
/// A directory holding `.git` is a repository and is not descended into.
/// Hidden directories are skipped; symlinked directories are followed.
pub fn find_git_repos(roots: &[PathBuf], max_depth: usize) -> Vec<PathBuf> {
    let mut repos = Vec::new();

    for root in roots {
        let mut walker = WalkDir::new(root)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.depth() > 0 && is_hidden(entry.path()) {
                walker.skip_current_dir();
                continue;
            }
            if entry.path().join(".git").exists() {
                let repo = entry
                    .path()
                    .canonicalize()
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                if !repos.contains(&repo) {
                    repos.push(repo);
                }
                walker.skip_current_dir();
            }
        }
    }

    repos
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_repos_within_depth() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/.git")).unwrap();
        fs::create_dir_all(tmp.path().join("group/b/.git")).unwrap();
        fs::create_dir_all(tmp.path().join("x/y/z/deep/.git")).unwrap();

        let repos = find_git_repos(&[tmp.path().to_path_buf()], 2);
        let names: Vec<String> = repos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_does_not_descend_into_repos_or_hidden_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("outer/.git")).unwrap();
        fs::create_dir_all(tmp.path().join("outer/nested/.git")).unwrap();
        fs::create_dir_all(tmp.path().join(".cache/hidden/.git")).unwrap();

        let repos = find_git_repos(&[tmp.path().to_path_buf()], 3);
        assert_eq!(repos.len(), 1);
        assert!(repos[0].ends_with("outer"));
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinked_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real");
        fs::create_dir_all(real.join("repo/.git")).unwrap();
        let scan_root = tmp.path().join("scan");
        fs::create_dir_all(&scan_root).unwrap();
        std::os::unix::fs::symlink(&real, scan_root.join("link")).unwrap();

        let repos = find_git_repos(&[scan_root], 2);
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0], real.join("repo").canonicalize().unwrap());
    }
}
