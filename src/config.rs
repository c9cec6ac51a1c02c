//! Configuration management for renbuild.
//!
//! This module provides the [`Config`] struct which controls how scripts are built.
//! Configuration can be loaded from:
//! - TOML files (`renbuild.toml`)
//! - CLI arguments (which override file settings)
//! - In-script directives (`:config nvl_suffix = "_nvl"`), effective from the next line
//!
//! Config files are auto-discovered by searching parent directories from the input
//! script up to the filesystem root, plus the user's home directory.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::BuildError;
use crate::rules::{compile_pattern, Anchor};

/// Config file names to search for (in order of priority, later overrides earlier)
const CONFIG_FILE_NAMES: &[&str] = &["renbuild.toml"];

/// Option keys accepted by `:config`
pub const OPTION_KEYS: &[&str] = &[
    "create_parent_files",
    "create_flow_control_file",
    "flow_control_ignore",
    "copy_special_comments",
    "nvl_character",
    "nvl_prefix",
    "nvl_suffix",
    "output_path",
    "auto_return",
    "abort_on_error",
];

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }
    None
}

// Serde default functions
fn default_true() -> bool {
    true
}
fn default_flow_control_ignore() -> Vec<String> {
    vec!["*_choice*".to_string(), "*_ignore*".to_string()]
}
fn default_special_comment() -> String {
    "#".to_string()
}
fn default_nvl_character() -> String {
    "NVL".to_string()
}
fn default_nvl_suffix() -> String {
    "_NVL".to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from(".")
}

/// Main configuration struct for renbuild
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Route each new top-level label root to its own `<root>.rpy` (default: false)
    #[serde(default)]
    pub create_parent_files: bool,

    /// Write `control.rpy` calling every non-ignored label (default: true)
    #[serde(default = "default_true")]
    pub create_flow_control_file: bool,

    /// Label globs left out of the control file
    #[serde(default = "default_flow_control_ignore")]
    pub flow_control_ignore: Vec<String>,

    /// Comments starting `#<marker>` are copied to the output (default: "#").
    /// Empty disables comment passthrough.
    #[serde(default = "default_special_comment")]
    pub copy_special_comments: String,

    /// Speaker used for narration inside NVL blocks (default: "NVL")
    #[serde(default = "default_nvl_character")]
    pub nvl_character: String,

    /// Prepended to dialogue speaker names inside NVL blocks
    #[serde(default)]
    pub nvl_prefix: String,

    /// Appended to dialogue speaker names inside NVL blocks (default: "_NVL")
    #[serde(default = "default_nvl_suffix")]
    pub nvl_suffix: String,

    /// Directory receiving generated files (default: ".")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Close label bodies with `return` when they do not end in one (default: false)
    #[serde(default)]
    pub auto_return: bool,

    /// Stop at the first error instead of logging it and continuing (default: true)
    #[serde(default = "default_true")]
    pub abort_on_error: bool,
}

/// Partial configuration for TOML parsing
///
/// All fields are `Option<T>` so we can distinguish between
/// "explicitly set" and "not specified" when merging configs.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    pub create_parent_files: Option<bool>,
    pub create_flow_control_file: Option<bool>,
    pub flow_control_ignore: Option<Vec<String>>,
    pub copy_special_comments: Option<String>,
    pub nvl_character: Option<String>,
    pub nvl_prefix: Option<String>,
    pub nvl_suffix: Option<String>,
    pub output_path: Option<PathBuf>,
    pub auto_return: Option<bool>,
    pub abort_on_error: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            create_parent_files: false,
            create_flow_control_file: true,
            flow_control_ignore: default_flow_control_ignore(),
            copy_special_comments: default_special_comment(),
            nvl_character: default_nvl_character(),
            nvl_prefix: String::new(),
            nvl_suffix: default_nvl_suffix(),
            output_path: default_output_path(),
            auto_return: false,
            abort_on_error: true,
        }
    }
}

impl Config {
    /// Validate configuration values
    ///
    /// Returns an error message if validation fails, None if valid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.copy_special_comments.chars().count() > 1 {
            return Some(format!(
                "copy_special_comments must be a single character, got {:?}",
                self.copy_special_comments
            ));
        }
        if self.nvl_character.trim().is_empty() {
            return Some("nvl_character must not be empty".to_string());
        }
        if self.output_path.as_os_str().is_empty() {
            return Some("output_path must not be empty".to_string());
        }
        for pattern in &self.flow_control_ignore {
            if let Err(e) = compile_pattern(pattern, Anchor::FullLine) {
                return Some(format!("flow_control_ignore: {e}"));
            }
        }
        None
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let partial: PartialConfig = toml::from_str(&contents)?;
        let mut config = Self::default();
        config.apply_partial(&partial);
        Ok(config)
    }

    /// Apply a partial config, only overriding fields that are explicitly set
    fn apply_partial(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.create_parent_files {
            self.create_parent_files = v;
        }
        if let Some(v) = partial.create_flow_control_file {
            self.create_flow_control_file = v;
        }
        if let Some(v) = &partial.flow_control_ignore {
            self.flow_control_ignore.clone_from(v);
        }
        if let Some(v) = &partial.copy_special_comments {
            self.copy_special_comments.clone_from(v);
        }
        if let Some(v) = &partial.nvl_character {
            self.nvl_character.clone_from(v);
        }
        if let Some(v) = &partial.nvl_prefix {
            self.nvl_prefix.clone_from(v);
        }
        if let Some(v) = &partial.nvl_suffix {
            self.nvl_suffix.clone_from(v);
        }
        if let Some(v) = &partial.output_path {
            self.output_path.clone_from(v);
        }
        if let Some(v) = partial.auto_return {
            self.auto_return = v;
        }
        if let Some(v) = partial.abort_on_error {
            self.abort_on_error = v;
        }
    }

    /// Set a single option from an in-script `:config key = value` directive.
    ///
    /// The value is read as a literal (`true`, `42`, `"text"`, `["a", "b"]`,
    /// with `True`/`False` also accepted). Anything that is not a valid
    /// literal is kept as a raw string.
    pub fn set_option(&mut self, key: &str, raw: &str) -> Result<(), BuildError> {
        if !OPTION_KEYS.contains(&key) {
            return Err(BuildError::UnknownConfigKey(key.to_string()));
        }

        let value = parse_literal(raw);
        if key == "flow_control_ignore" && !is_string_list(&value) {
            return Err(BuildError::MalformedIgnoreList(raw.to_string()));
        }

        let mut table = toml::Table::new();
        table.insert(key.to_string(), value);
        let partial: PartialConfig =
            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| BuildError::InvalidConfigValue {
                    key: key.to_string(),
                    reason: e.message().to_string(),
                })?;

        let mut updated = self.clone();
        updated.apply_partial(&partial);
        if let Some(reason) = updated.validate() {
            return Err(match key {
                "flow_control_ignore" => BuildError::MalformedIgnoreList(reason),
                _ => BuildError::InvalidConfigValue {
                    key: key.to_string(),
                    reason,
                },
            });
        }
        *self = updated;
        Ok(())
    }

    /// Discover config files from parent directories of a given path
    ///
    /// Searches from the file's directory up to the root, then adds home directory config.
    /// Returns list of config file paths in order of priority (least specific first).
    #[must_use]
    pub fn discover_config_files(start_path: &Path) -> Vec<PathBuf> {
        let mut config_files = Vec::new();

        if let Some(home) = dirs_home() {
            for config_name in CONFIG_FILE_NAMES {
                let home_config = home.join(config_name);
                if home_config.is_file() {
                    config_files.push(home_config);
                }
            }
        }

        let start_dir = if start_path.is_file() {
            start_path.parent().map(Path::to_path_buf)
        } else if start_path.is_dir() {
            Some(start_path.to_path_buf())
        } else {
            std::env::current_dir().ok()
        };

        if let Some(dir) = start_dir {
            let mut ancestors: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
            // Root first, so closer configs override
            ancestors.reverse();

            for ancestor in ancestors {
                for config_name in CONFIG_FILE_NAMES {
                    let config_path = ancestor.join(config_name);
                    if config_path.is_file() && !config_files.contains(&config_path) {
                        config_files.push(config_path);
                    }
                }
            }
        }

        config_files
    }

    /// Load and merge configuration from discovered config files
    ///
    /// Later files override earlier ones (only explicitly set values).
    /// Returns default config if no files found.
    #[must_use]
    pub fn from_discovered_files(start_path: &Path) -> Self {
        let mut config = Self::default();
        for path in &Self::discover_config_files(start_path) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<PartialConfig>(&contents) {
                    Ok(partial) => config.apply_partial(&partial),
                    Err(e) => warn!("Failed to parse {}: {e}", path.display()),
                },
                Err(e) => warn!("Failed to read {}: {e}", path.display()),
            }
        }
        config
    }
}

/// Read a `:config` value as a TOML literal, falling back to a raw string
fn parse_literal(raw: &str) -> toml::Value {
    let raw = raw.trim();
    match raw {
        "True" => return toml::Value::Boolean(true),
        "False" => return toml::Value::Boolean(false),
        _ => {}
    }
    format!("value = {raw}")
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn is_string_list(value: &toml::Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(toml::Value::is_str))
}
