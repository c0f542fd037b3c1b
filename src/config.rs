//! Workspace configuration, stored as `.lessonnote/config.yaml`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LessonNoteError, Result};

const CONFIG_FILE: &str = "config.yaml";

/// Environment variable that overrides `default_user`
pub const USER_ENV: &str = "LESSONNOTE_USER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User that CLI commands act as when `--user` is not given
    pub default_user: String,
    /// Address for `lessonnote serve`
    pub bind: String,
    /// Where `lessonnote export` writes, relative to the workspace root
    pub export_dir: String,
    /// Maximum search hits returned
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_user: "student".to_string(),
            bind: "127.0.0.1:4680".to_string(),
            export_dir: "notes-export".to_string(),
            search_limit: 50,
        }
    }
}

impl Config {
    /// Load the config from a data directory. A missing file means defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| LessonNoteError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| LessonNoteError::Config(format!("YAML serialization failed: {}", e)))?;
        fs::write(data_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_limit == 0 {
            return Err(LessonNoteError::Config("search_limit must be at least 1".to_string()));
        }
        if self.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(LessonNoteError::Config(format!(
                "bind '{}' is not a socket address",
                self.bind
            )));
        }
        Ok(())
    }

    /// The acting user: explicit flag, then `LESSONNOTE_USER`, then `default_user`.
    /// Blank values at any step are skipped.
    pub fn resolve_user(&self, explicit: Option<String>) -> String {
        self.pick_user(explicit, std::env::var(USER_ENV).ok())
    }

    fn pick_user(&self, explicit: Option<String>, from_env: Option<String>) -> String {
        let non_blank = |u: &String| !u.trim().is_empty();
        explicit
            .filter(non_blank)
            .or_else(|| from_env.filter(non_blank))
            .unwrap_or_else(|| self.default_user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search_limit, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Config::load(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            default_user: "anna".to_string(),
            ..Default::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(Config::load(tmp.path()).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "default_user: piet\n").unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.default_user, "piet");
        assert_eq!(config.bind, "127.0.0.1:4680");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "search_limit: 0\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());

        fs::write(tmp.path().join(CONFIG_FILE), "bind: nowhere\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn test_explicit_user_wins() {
        let config = Config::default();
        assert_eq!(config.resolve_user(Some("jan".to_string())), "jan");
        assert_eq!(
            config.pick_user(Some("jan".to_string()), Some("env".to_string())),
            "jan"
        );
    }

    #[test]
    fn test_blank_explicit_user_falls_back_to_env() {
        let config = Config::default();
        assert_eq!(
            config.pick_user(Some("  ".to_string()), Some("eva".to_string())),
            "eva"
        );
        assert_eq!(config.pick_user(Some(String::new()), Some(" ".to_string())), "student");
        assert_eq!(config.pick_user(None, None), "student");
    }
}
