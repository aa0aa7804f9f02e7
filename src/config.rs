//! Configuration system for the checker
//!
//! Reads configuration from:
//! - `.conformrc.yaml` / `.conformrc.json` / `conform.yaml` (project-level)
//! - the same names in the home directory (user-level)
//!
//! Relative document and rule file paths are resolved against the directory
//! of the file that names them.

use crate::builtin::Parameters;
use crate::engine::Binding;
use crate::outcome::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// File names searched by [`Config::load_default`], in order
pub const CONFIG_NAMES: [&str; 6] = [
    ".conformrc.yaml",
    ".conformrc.yml",
    ".conformrc.json",
    "conform.yaml",
    "conform.yml",
    "conform.json",
];

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate bindings in parallel
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Color mode
    pub color: ColorMode,

    /// Show passed outcomes too
    pub verbose: bool,

    /// Show statistics
    pub statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Github,
    Compact,
    Junit,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "github" => Ok(OutputFormat::Github),
            "compact" => Ok(OutputFormat::Compact),
            "junit" => Ok(OutputFormat::Junit),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rules
    pub disabled: Vec<String>,

    /// Enabled rules (empty = all)
    pub enabled: Vec<String>,

    /// Select rules by prefix (e.g., "compose-" selects all compose rules)
    pub select: Vec<String>,

    /// Ignore rules by prefix
    pub ignore: Vec<String>,

    /// Severity overrides (rule_id -> severity)
    pub severity: BTreeMap<String, Severity>,

    /// Per-document rule ignores (glob over label or path -> rule IDs)
    pub per_document: BTreeMap<String, Vec<String>>,
}

impl RulesConfig {
    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        if self.disabled.iter().any(|d| d == rule_id) {
            return false;
        }

        // Prefixes compare case-insensitively
        let rule_upper = rule_id.to_uppercase();
        if self
            .ignore
            .iter()
            .any(|prefix| rule_upper.starts_with(&prefix.to_uppercase()))
        {
            return false;
        }

        if !self.enabled.is_empty() {
            return self.enabled.iter().any(|e| e == rule_id);
        }

        if !self.select.is_empty() {
            return self
                .select
                .iter()
                .any(|prefix| rule_upper.starts_with(&prefix.to_uppercase()));
        }

        true
    }

    /// Get severity override for a rule
    pub fn severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.severity.get(rule_id).copied()
    }

    /// Check if a rule is switched off for one document, matching the
    /// globs against the document label and its source path
    pub fn is_ignored_for_document(&self, rule_id: &str, label: &str, source: Option<&Path>) -> bool {
        let source = source.map(|p| p.to_string_lossy().into_owned());

        for (pattern, rules) in &self.per_document {
            if !(rules.iter().any(|r| r == "all" || r == rule_id)) {
                continue;
            }
            let matcher = match globset::Glob::new(pattern) {
                Ok(glob) => glob.compile_matcher(),
                Err(e) => {
                    log::warn!("ignoring invalid per_document pattern '{}': {}", pattern, e);
                    continue;
                }
            };
            if matcher.is_match(label) || source.as_deref().is_some_and(|s| matcher.is_match(s)) {
                return true;
            }
        }

        false
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extend from other configuration files
    pub extends: Vec<String>,

    /// Engine settings
    pub engine: EngineConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Documents by label
    pub documents: BTreeMap<String, PathBuf>,

    /// Rule files by label
    pub rule_sets: BTreeMap<String, PathBuf>,

    /// Explicit document/rule set pairs
    pub bindings: Vec<Binding>,

    /// File glob -> rule set label, consulted before the built-in detection
    pub detect: BTreeMap<String, String>,

    /// Rule configuration
    pub rules: RulesConfig,

    /// Overrides for built-in rule set parameters
    pub parameters: serde_yaml::Mapping,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent infinite loops)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        let base_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base_dir);

        if !config.extends.is_empty() {
            let mut base_config = Self::default();

            for extend in &config.extends.clone() {
                let extend_path = if Path::new(extend).is_absolute() {
                    PathBuf::from(extend)
                } else {
                    base_dir.join(extend)
                };
                let extended = Self::load_with_depth(&extend_path, depth + 1)?;
                base_config.merge(extended);
            }

            // Merge current config on top of base
            base_config.merge(config);
            config = base_config;
        }

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        for path in self.documents.values_mut().chain(self.rule_sets.values_mut()) {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        // Extends are not inherited

        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        // parallel always inherits from other
        self.engine.parallel = other.engine.parallel;

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        if !other.output.statistics {
            self.output.statistics = false;
        }

        self.documents.extend(other.documents);
        self.rule_sets.extend(other.rule_sets);
        for binding in other.bindings {
            if !self.bindings.contains(&binding) {
                self.bindings.push(binding);
            }
        }
        self.detect.extend(other.detect);

        self.rules.disabled.extend(other.rules.disabled);
        if !other.rules.enabled.is_empty() {
            self.rules.enabled = other.rules.enabled;
        }
        self.rules.select.extend(other.rules.select);
        self.rules.ignore.extend(other.rules.ignore);
        self.rules.severity.extend(other.rules.severity);
        for (pattern, rules) in other.rules.per_document {
            self.rules
                .per_document
                .entry(pattern)
                .or_default()
                .extend(rules);
        }

        for (key, value) in other.parameters {
            self.parameters.insert(key, value);
        }
    }

    /// Path of the first configuration file found in the current directory,
    /// then the home directory
    pub fn find_default() -> Option<PathBuf> {
        for name in &CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Some(path);
            }
        }

        let home = dirs::home_dir()?;
        CONFIG_NAMES
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_default() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
    }

    /// Add prefixes to select
    pub fn add_select_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.select.extend(prefixes);
    }

    /// Add prefixes to ignore
    pub fn add_ignore_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.ignore.extend(prefixes);
    }

    /// Built-in rule set parameters with the configured overrides applied
    pub fn parameters(&self) -> Result<Parameters, ConfigError> {
        if self.parameters.is_empty() {
            return Ok(Parameters::default());
        }
        serde_yaml::from_value(serde_yaml::Value::Mapping(self.parameters.clone()))
            .map_err(|e| ConfigError::Invalid(format!("parameters: {}", e)))
    }
}
