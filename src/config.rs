use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reconcile::Category;

const APP_DIR: &str = "worktree-deck";

/// User configuration, read from `<config dir>/worktree-deck/config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned for repositories in `--scan` mode
    pub search_paths: Vec<String>,
    /// How many directory levels below each search path to look
    pub depth: usize,
    /// Delay between refreshes
    pub refresh_interval_ms: u64,
    /// Filter applied at startup
    pub default_filter: Category,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            depth: 2,
            refresh_interval_ms: 2000,
            default_filter: Category::All,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        if config.depth == 0 {
            config.depth = Self::default().depth;
        }
        if config.refresh_interval_ms == 0 {
            config.refresh_interval_ms = Self::default().refresh_interval_ms;
        }

        Ok(config)
    }

    /// Search paths with `~` expanded
    pub fn expanded_search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.iter().map(|p| expand_tilde(p)).collect()
    }
}

/// Directory for the log file
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Replace a leading `~` with the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return PathBuf::from(path),
    };

    if path == "~" {
        home
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"search_paths": ["~/code"], "depth": 0, "default_filter": "orphans"}}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.search_paths, vec!["~/code".to_string()]);
        assert_eq!(config.depth, 2);
        assert_eq!(config.refresh_interval_ms, 2000);
        assert_eq!(config.default_filter, Category::Orphans);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/projects"), home.join("projects"));
        assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_tilde("relative/path"), PathBuf::from("relative/path"));
    }
}
