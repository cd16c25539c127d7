use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::query::{CancelFlag, CritiqueOptions, DEFAULT_MAX_RETRIES};

/// User settings read from `~/.critique.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database: PathBuf,
    /// Explicit Claude CLI path; auto-detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_cli: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Attempts per JSON query
    pub max_retries: u32,
    /// Wall-clock limit for one critique call, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("critique.db"),
            claude_cli: None,
            model: None,
            max_retries: DEFAULT_MAX_RETRIES,
            deadline_secs: None,
        }
    }
}

impl Settings {
    /// Loads settings from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path.as_ref()))
    }

    /// Loads settings, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the settings to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Orchestration options with a fresh cancel flag
    pub fn critique_options(&self) -> CritiqueOptions {
        CritiqueOptions {
            max_retries: self.max_retries,
            cancel: CancelFlag::new(),
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

/// Gets the path to the settings file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CRITIQUE_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home_dir.join(".critique.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_retries, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        fs::write(file.path(), "model: sonnet\ndeadline_secs: 90\n").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.model.as_deref(), Some("sonnet"));
        assert_eq!(settings.database, PathBuf::from("critique.db"));

        let options = settings.critique_options();
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.deadline, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("critique.yaml");
        let settings = Settings {
            database: PathBuf::from("/var/lib/critique/critique.db"),
            claude_cli: Some(PathBuf::from("/usr/local/bin/claude")),
            max_retries: 3,
            ..Settings::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        fs::write(file.path(), "max_retries: [not, a, number]\n").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }
}
