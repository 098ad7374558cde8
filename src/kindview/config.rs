use crate::error::{BrowseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_PROJECT: &str = "my-project";
const DEFAULT_EMULATOR_HOST: &str = "localhost:8081";
const DEFAULT_EMULATOR_HOST_PATH: &str = "localhost:8081/datastore";
const DEFAULT_DATASTORE_HOST: &str = "http://localhost:8081";
pub const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys accepted by [`BrowserConfig::get`] and [`BrowserConfig::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "dataset",
    "project",
    "emulator-host",
    "emulator-host-path",
    "datastore-host",
    "namespace",
    "timeout",
    "page-size",
    "data-file",
];

/// Connection and paging settings, stored as `config.json` in the user's
/// config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserConfig {
    #[serde(default = "default_project")]
    pub dataset_id: String,

    #[serde(default = "default_project")]
    pub project_id: String,

    /// `host:port` the emulator listens on.
    #[serde(default = "default_emulator_host")]
    pub emulator_host: String,

    #[serde(default = "default_emulator_host_path")]
    pub emulator_host_path: String,

    /// Base URL of the REST endpoint. Falls back to `http://{emulator_host}` when empty.
    #[serde(default = "default_datastore_host")]
    pub datastore_host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// When set, browse this dump file instead of the emulator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_emulator_host() -> String {
    DEFAULT_EMULATOR_HOST.to_string()
}

fn default_emulator_host_path() -> String {
    DEFAULT_EMULATOR_HOST_PATH.to_string()
}

fn default_datastore_host() -> String {
    DEFAULT_DATASTORE_HOST.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            dataset_id: default_project(),
            project_id: default_project(),
            emulator_host: default_emulator_host(),
            emulator_host_path: default_emulator_host_path(),
            datastore_host: default_datastore_host(),
            namespace: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            data_file: None,
        }
    }
}

/// Directory holding the user's `config.json`, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kindview").map(|dirs| dirs.config_dir().to_path_buf())
}

impl BrowserConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::load_file(config_dir.as_ref().join(CONFIG_FILENAME))
    }

    /// Load config from an explicit file path, or return defaults if it does not exist
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: BrowserConfig = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        self.save_file(config_dir.as_ref().join(CONFIG_FILENAME))
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Base URL for REST calls.
    pub fn endpoint(&self) -> String {
        let host = if self.datastore_host.is_empty() {
            format!("http://{}", self.emulator_host)
        } else {
            self.datastore_host.clone()
        };
        host.trim_end_matches('/').to_string()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "dataset" => self.dataset_id.clone(),
            "project" => self.project_id.clone(),
            "emulator-host" => self.emulator_host.clone(),
            "emulator-host-path" => self.emulator_host_path.clone(),
            "datastore-host" => self.datastore_host.clone(),
            "namespace" => self.namespace.clone().unwrap_or_default(),
            "timeout" => self.request_timeout_secs.to_string(),
            "page-size" => self.page_size.to_string(),
            "data-file" => self
                .data_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    /// Sets a key from its textual form. Empty values clear optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "dataset" => self.dataset_id = value.to_string(),
            "project" => self.project_id = value.to_string(),
            "emulator-host" => self.emulator_host = value.to_string(),
            "emulator-host-path" => self.emulator_host_path = value.to_string(),
            "datastore-host" => self.datastore_host = value.to_string(),
            "namespace" => self.namespace = non_empty(value).map(str::to_string),
            "timeout" => {
                self.request_timeout_secs = value.parse().map_err(|_| {
                    BrowseError::Config(format!("timeout must be a number of seconds, got '{value}'"))
                })?
            }
            "page-size" => self.page_size = parse_page_size(value)?,
            "data-file" => self.data_file = non_empty(value).map(PathBuf::from),
            _ => return Err(BrowseError::Config(format!("Unknown config key: {key}"))),
        }
        Ok(())
    }

    /// `(key, value)` pairs for display, in [`CONFIG_KEYS`] order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn parse_page_size(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(BrowseError::Config(format!(
            "page size must be a positive number, got '{value}'"
        ))),
    }
}
