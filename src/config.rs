// Configuration loaded from YAML with environment overrides

use crate::autosave::DEFAULT_AUTOSAVE_INTERVAL;
use crate::backend::{ByteStore, FileByteStore, SqliteByteStore};
use crate::store::{DEFAULT_STORAGE_KEY, StoreOptions, WELCOME_TASK_TEXT};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const LOCAL_CONFIG_FILE: &str = "taskmaster.yaml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::File => write!(f, "file"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(format!("Unknown backend: {} (expected file or sqlite)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: BackendKind,
    pub storage_key: String,
    pub autosave_secs: u64,
    /// `null` disables the welcome task
    pub welcome_task: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::File,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            autosave_secs: DEFAULT_AUTOSAVE_INTERVAL.as_secs(),
            welcome_task: Some(WELCOME_TASK_TEXT.to_string()),
            log_level: "warn".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("taskmaster"))
        .unwrap_or_else(|| PathBuf::from(".taskmaster"))
}

impl Config {
    /// Load from `path`, or the first default location that exists, then apply
    /// environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
                if let Some(dir) = dirs::config_dir() {
                    candidates.push(dir.join("taskmaster").join("config.yaml"));
                }

                match candidates.iter().find(|p| p.is_file()) {
                    Some(p) => Self::from_file(p)?,
                    None => {
                        debug!("No config file found, using defaults");
                        Self::default()
                    }
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))?;
        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Override fields from `TASKMASTER_*` variables looked up through `var`
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("TASKMASTER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = var("TASKMASTER_BACKEND") {
            self.backend = backend.parse::<BackendKind>().map_err(|e: String| eyre!(e))?;
        }
        if let Some(secs) = var("TASKMASTER_AUTOSAVE_SECS") {
            self.autosave_secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid TASKMASTER_AUTOSAVE_SECS: {}", secs))?;
        }
        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            storage_key: self.storage_key.clone(),
            welcome_task: self.welcome_task.clone(),
        }
    }

    /// Open the configured byte store under `data_dir`
    pub fn open_backend(&self) -> Result<Box<dyn ByteStore>> {
        let backend: Box<dyn ByteStore> = match self.backend {
            BackendKind::File => Box::new(FileByteStore::open(&self.data_dir)?),
            BackendKind::Sqlite => Box::new(SqliteByteStore::open(&self.data_dir)?),
        };
        debug!(backend = %self.backend, data_dir = ?self.data_dir, "Opened backend");
        Ok(backend)
    }
}
