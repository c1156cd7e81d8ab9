//! Configuration loading and management
//!
//! Handles parsing of `.mdtask.toml` configuration files.

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::task::Status;

const APP_NAME: &str = "mdtask";

/// File names probed in the working directory, in order
pub const LOCAL_CONFIG_FILES: [&str; 2] = [".mdtask.toml", "mdtask.toml"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Task directories; new tasks go into the first
    #[serde(default = "default_paths")]
    pub paths: Vec<PathBuf>,

    /// Task creation defaults
    #[serde(default)]
    pub task: TaskConfig,

    /// Directory relative `paths` are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            task: TaskConfig::default(),
            base_dir: None,
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

/// Defaults applied by the service when creating tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Prepended to every new title
    #[serde(default)]
    pub title_prefix: String,

    /// Status for new tasks without an explicit one
    #[serde(default = "default_status")]
    pub default_status: String,

    /// Used when no description is given
    #[serde(default)]
    pub description_template: String,

    /// Used when no content is given
    #[serde(default)]
    pub content_template: String,

    /// Added to every new task
    #[serde(default)]
    pub default_tags: Vec<String>,

    /// Subtasks without an explicit status take the parent's,
    /// unless `default_status` is something other than TODO
    #[serde(default = "default_true")]
    pub inherit_parent_status: bool,
}

fn default_status() -> String {
    Status::Todo.as_str().to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            title_prefix: String::new(),
            default_status: default_status(),
            description_template: String::new(),
            content_template: String::new(),
            default_tags: vec![],
            inherit_parent_status: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// First config found in the search order, or defaults rooted at `cwd`
    pub fn discover(cwd: &Path) -> Self {
        for candidate in Self::candidate_paths(cwd) {
            if !candidate.is_file() {
                continue;
            }
            match Self::load(&candidate) {
                Ok(config) => {
                    debug!(path = %candidate.display(), "loaded config");
                    return config;
                }
                Err(err) => {
                    warn!(path = %candidate.display(), error = %err, "ignoring invalid config");
                    break;
                }
            }
        }
        Self::default().with_base_dir(cwd)
    }

    /// Where [`Config::discover`] looks, in order
    pub fn candidate_paths(cwd: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = LOCAL_CONFIG_FILES
            .iter()
            .map(|name| cwd.join(name))
            .collect();
        if let Some(dirs) = ProjectDirs::from("", "", APP_NAME) {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        if let Some(dirs) = BaseDirs::new() {
            paths.push(dirs.home_dir().join(LOCAL_CONFIG_FILES[0]));
        }
        paths
    }

    pub fn with_base_dir(mut self, dir: &Path) -> Self {
        self.base_dir = Some(dir.to_path_buf());
        self
    }

    /// `paths` with relative entries joined onto the config's directory
    pub fn resolved_paths(&self) -> Vec<PathBuf> {
        self.paths
            .iter()
            .map(|path| match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })
            .collect()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::InvalidConfig("paths cannot be empty".to_string()));
        }
        if self.paths.iter().any(|path| path.as_os_str().is_empty()) {
            return Err(Error::InvalidConfig(
                "paths cannot include empty entries".to_string(),
            ));
        }
        self.task.validate()
    }
}

impl TaskConfig {
    fn validate(&self) -> Result<()> {
        self.default_status.parse::<Status>().map_err(|_| {
            Error::InvalidConfig(format!(
                "task.default_status '{}' is not a known status",
                self.default_status
            ))
        })?;

        if self.description_template.contains(['\n', '\r']) {
            return Err(Error::InvalidConfig(
                "task.description_template must be a single line".to_string(),
            ));
        }

        if self.default_tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "task.default_tags cannot include empty entries".to_string(),
            ));
        }

        Ok(())
    }
}
