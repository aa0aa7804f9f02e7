//! Named, ordered collections of rules

use crate::config::RulesConfig;
use crate::document::{Document, PathError};
use crate::loader::Format;
use crate::outcome::Outcome;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error building a rule set
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("duplicate rule id '{id}' in rule set '{set}'")]
    DuplicateRuleId { set: String, id: String },

    #[error("invalid rule pattern: {0}")]
    InvalidPattern(#[from] PathError),

    #[error("failed to read rule file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rule file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Rule file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetFile {
    /// Rule set name; defaults to the file stem
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Rules defined in this file
    pub rules: Vec<Rule>,
}

/// An ordered collection of rules with unique ids
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    description: Option<String>,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            rules: Vec::new(),
        }
    }

    /// Build a set from rules; fails on the first duplicate id
    pub fn from_rules(name: &str, rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut set = Self::new(name);
        for rule in rules {
            set.add(rule)?;
        }
        Ok(set)
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Append a rule, rejecting an id already in the set
    pub fn add(&mut self, rule: Rule) -> Result<(), RuleSetError> {
        if self.get(&rule.id).is_some() {
            return Err(RuleSetError::DuplicateRuleId {
                set: self.name.clone(),
                id: rule.id,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every enabled rule, outcomes in rule order
    pub fn evaluate(&self, document: &Document) -> Vec<Outcome> {
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .flat_map(|r| r.evaluate(document))
            .collect()
    }

    /// Copy of this set with project filters and severity overrides applied
    /// for one document
    pub fn configured(&self, config: &RulesConfig, label: &str, source: Option<&Path>) -> RuleSet {
        let rules = self
            .rules
            .iter()
            .map(|rule| {
                let mut rule = rule.clone();
                if !config.is_rule_enabled(&rule.id)
                    || config.is_ignored_for_document(&rule.id, label, source)
                {
                    rule.enabled = false;
                } else if config.enabled.contains(&rule.id) {
                    rule.enabled = true;
                }
                if let Some(severity) = config.severity_override(&rule.id) {
                    rule.severity = severity;
                }
                rule
            })
            .collect();

        RuleSet {
            name: self.name.clone(),
            description: self.description.clone(),
            rules,
        }
    }

    /// Parse rule file text
    pub fn parse_str(
        content: &str,
        format: Format,
        default_name: &str,
        path: &Path,
    ) -> Result<Self, RuleSetError> {
        let file: RuleSetFile = match format {
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| RuleSetError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            Format::Json => serde_json::from_str(content).map_err(|e| RuleSetError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };

        let name = file.name.as_deref().unwrap_or(default_name);
        let mut set = Self::from_rules(name, file.rules)?;
        set.description = file.description;
        Ok(set)
    }

    /// Load a rule file (YAML or JSON by extension)
    pub fn load(path: &Path) -> Result<Self, RuleSetError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rules");

        let set = Self::parse_str(&content, Format::from_path(path), stem, path)?;
        log::debug!(
            "loaded rule set '{}' ({} rules) from {}",
            set.name,
            set.len(),
            path.display()
        );
        Ok(set)
    }
}
