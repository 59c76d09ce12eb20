use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub pane: PaneConfig,
}

/// Tree/content synchronization behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SyncConfig {
    /// Whether the tree follows the content pane when a session starts
    #[serde(default = "default_true")]
    pub enabled_on_start: bool,

    /// Collapse branches that are not on the newly synced path
    #[serde(default = "default_true")]
    pub collapse_on_navigate: bool,

    /// Targets of nodes that stay expanded regardless of navigation
    #[serde(default)]
    pub pinned_open: Vec<String>,

    /// Retry `page.html#anchor` as `page.html` when the anchor is not indexed
    #[serde(default = "default_false")]
    pub anchor_fallback: bool,

    /// Toggle label while synchronization is on
    #[serde(default = "default_sync_on_label")]
    pub sync_on_label: String,

    /// Toggle label while synchronization is off
    #[serde(default = "default_sync_off_label")]
    pub sync_off_label: String,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_sync_on_label() -> String {
    "click to disable panel synchronisation".to_string()
}

fn default_sync_off_label() -> String {
    "click to enable panel synchronisation".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled_on_start: true,
            collapse_on_navigate: true,
            pinned_open: Vec::new(),
            anchor_fallback: false,
            sync_on_label: default_sync_on_label(),
            sync_off_label: default_sync_off_label(),
        }
    }
}

/// Names of the generated navigation scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataConfig {
    /// Script holding the tree and the index chunk heads
    #[serde(default = "default_tree_file")]
    pub tree_file: String,

    #[serde(default = "default_tree_var")]
    pub tree_var: String,

    /// Variable listing the first reference of each index chunk; chunk `N`
    /// is declared as `<index_var>N`
    #[serde(default = "default_index_var")]
    pub index_var: String,

    /// Index chunk `N` is read from `<index_chunk_prefix>N.js`
    #[serde(default = "default_index_chunk_prefix")]
    pub index_chunk_prefix: String,

    /// Number of decoded index chunks kept in memory
    #[serde(default = "default_index_cache_size")]
    pub index_cache_size: usize,

    /// Label of the synthetic root used when the tree has several top-level entries
    #[serde(default = "default_root_label")]
    pub root_label: String,
}

fn default_tree_file() -> String {
    "navtreedata.js".to_string()
}

fn default_tree_var() -> String {
    "NAVTREE".to_string()
}

fn default_index_var() -> String {
    "NAVTREEINDEX".to_string()
}

fn default_index_chunk_prefix() -> String {
    "navtreeindex".to_string()
}

fn default_index_cache_size() -> usize {
    8
}

fn default_root_label() -> String {
    "Documentation".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            tree_file: default_tree_file(),
            tree_var: default_tree_var(),
            index_var: default_index_var(),
            index_chunk_prefix: default_index_chunk_prefix(),
            index_cache_size: default_index_cache_size(),
            root_label: default_root_label(),
        }
    }
}

/// Tree pane appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PaneConfig {
    /// Width of the tree pane as a fraction of the terminal (0.1 - 0.9)
    #[serde(default = "default_pane_width")]
    pub width_percent: f32,

    /// Show each node's target next to its label
    #[serde(default = "default_false")]
    pub show_targets: bool,
}

fn default_pane_width() -> f32 {
    0.35
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            width_percent: default_pane_width(),
            show_targets: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::load_from_file(default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/navtree/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("navtree").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.1..=0.9).contains(&self.pane.width_percent) {
            return Err(ConfigError::ValidationError(format!(
                "pane.width_percent must be between 0.1 and 0.9, got {}",
                self.pane.width_percent
            )));
        }

        if self.data.index_cache_size == 0 {
            return Err(ConfigError::ValidationError(
                "data.index_cache_size must be greater than 0".to_string(),
            ));
        }

        for (field, value) in [
            ("data.tree_file", &self.data.tree_file),
            ("data.tree_var", &self.data.tree_var),
            ("data.index_var", &self.data.index_var),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{field} must not be empty"
                )));
            }
        }

        if self.sync.sync_on_label == self.sync.sync_off_label {
            return Err(ConfigError::ValidationError(
                "sync_on_label and sync_off_label must differ".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
