//! Rune animation configuration system
//!
//! This crate provides centralized configuration management for the Rune animation
//! engine, loading settings from `rune.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Animation engine settings
    pub animate: AnimateConfig,
    /// Scenario runner settings
    pub demo: DemoConfig,
}

/// Animation engine configuration
///
/// Class names and attribute names the engine writes to or reads from elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimateConfig {
    /// Master switch. A disabled engine resolves every request immediately.
    pub enabled: bool,
    /// Marker class applied while an animation is in flight
    pub animate_class: String,
    /// Suffix of the structural "prepare" hint class (`ng-enter-prepare`)
    pub prepare_suffix: String,
    /// Prefix of framework-owned classes, ignored when pairing anchors
    pub reserved_prefix: String,
    /// Attribute linking two elements across a structural transition
    pub anchor_attribute: String,
}

/// Scenario runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Scenario file to run when none is passed on the command line
    pub scenario: Option<PathBuf>,
    /// Pretty-print the JSON trace
    pub pretty: bool,
}

impl Default for AnimateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            animate_class: "ng-animate".to_string(),
            prepare_suffix: "-prepare".to_string(),
            reserved_prefix: "ng-".to_string(),
            anchor_attribute: "ng-animate-ref".to_string(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            scenario: None,
            pretty: true,
        }
    }
}

impl AnimateConfig {
    /// Prepare hint class for a structural event name, e.g. `ng-enter-prepare`
    pub fn prepare_class(&self, event: &str) -> String {
        format!("{}{}{}", self.reserved_prefix, event, self.prepare_suffix)
    }
}

fn env_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl RuneConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the rune.toml configuration file
    ///
    /// # Returns
    /// * `Ok(RuneConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("rune.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("RUNE_ANIMATE_ENABLED") {
            self.animate.enabled = env_flag(&val);
        }
        if let Ok(class) = std::env::var("RUNE_ANIMATE_CLASS") {
            if !class.trim().is_empty() {
                self.animate.animate_class = class.trim().to_string();
            }
        }
        if let Ok(prefix) = std::env::var("RUNE_ANIMATE_RESERVED_PREFIX") {
            self.animate.reserved_prefix = prefix;
        }
        if let Ok(attr) = std::env::var("RUNE_ANIMATE_ANCHOR_ATTR") {
            if !attr.trim().is_empty() {
                self.animate.anchor_attribute = attr.trim().to_string();
            }
        }

        if let Ok(path) = std::env::var("RUNE_SCENARIO") {
            self.demo.scenario = Some(PathBuf::from(path));
        }
        if let Ok(val) = std::env::var("RUNE_TRACE_PRETTY") {
            self.demo.pretty = env_flag(&val);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
