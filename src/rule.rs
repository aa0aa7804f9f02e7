//! Rule definition and evaluation

use crate::check::{Check, MatchContext, PredicateError};
use crate::document::{Document, Node, PathError, PathPattern};
use crate::outcome::{Outcome, Severity};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A conformance rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier (e.g., "compose-restart-policy")
    pub id: String,

    /// Detailed description
    #[serde(default)]
    pub description: Option<String>,

    /// Severity of a failure
    #[serde(default)]
    pub severity: Severity,

    /// Locations the rule applies to (e.g., "services.*.restart")
    pub pattern: PathPattern,

    /// Fail once at the pattern when nothing matches
    #[serde(default)]
    pub require_match: bool,

    /// Predicate applied to every match
    pub check: Check,

    /// Message template; `{path}`, `{value}`, `{rule}` and `{expected}` are
    /// substituted. Empty means a message built from the check.
    #[serde(default)]
    pub message: String,

    /// Documentation URL
    #[serde(default)]
    pub docs: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether this rule is enabled by default
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Rule {
    /// Create a new rule over a pattern
    pub fn new(id: &str, pattern: &str, check: Check) -> Result<Self, PathError> {
        Ok(Self {
            id: id.to_string(),
            description: None,
            severity: Severity::default(),
            pattern: pattern.parse()?,
            require_match: false,
            check,
            message: String::new(),
            docs: None,
            tags: Vec::new(),
            enabled: true,
        })
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Builder: set message template
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    /// Builder: fail when the pattern matches nothing
    pub fn required(mut self) -> Self {
        self.require_match = true;
        self
    }

    /// Builder: add tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Builder: set docs URL
    pub fn with_docs(mut self, url: &str) -> Self {
        self.docs = Some(url.to_string());
        self
    }

    /// Builder: set enabled state
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Evaluate the rule against a document, one outcome per match
    pub fn evaluate(&self, document: &Document) -> Vec<Outcome> {
        let mut outcomes = Vec::new();

        for (path, node) in document.match_all(&self.pattern) {
            let ctx = MatchContext::new(document, &path);
            let path_text = path.to_string();

            let outcome = match self.test(node, &ctx) {
                Ok(true) => Outcome::passed(
                    &self.id,
                    &path_text,
                    self.severity,
                    &self.render(&path_text, Some(node)),
                ),
                Ok(false) => Outcome::failed(
                    &self.id,
                    &path_text,
                    self.severity,
                    &self.render(&path_text, Some(node)),
                ),
                Err(e) => {
                    log::debug!("rule '{}' errored at {}: {}", self.id, path_text, e);
                    Outcome::predicate_error(
                        &self.id,
                        &path_text,
                        &format!("rule '{}' could not be evaluated at {}: {}", self.id, path_text, e),
                    )
                }
            };
            outcomes.push(outcome);
        }

        if outcomes.is_empty() && self.require_match {
            let pattern = self.pattern.to_string();
            let mut message = self.render(&pattern, None);
            if !message.contains(&pattern) {
                message = format!("{} (nothing matches {})", message, pattern);
            }
            outcomes.push(Outcome::failed(&self.id, &pattern, self.severity, &message));
        }

        outcomes
    }

    /// Run the check, turning a panic into a predicate error
    fn test(&self, node: &Node, ctx: &MatchContext<'_>) -> Result<bool, PredicateError> {
        match catch_unwind(AssertUnwindSafe(|| self.check.test(node, ctx))) {
            Ok(result) => result,
            Err(payload) => Err(PredicateError::Panicked(panic_payload_to_string(
                payload.as_ref(),
            ))),
        }
    }

    /// Format a message with placeholders
    pub fn render(&self, path: &str, value: Option<&Node>) -> String {
        let template = if self.message.is_empty() {
            "{path} must {expected}"
        } else {
            self.message.as_str()
        };

        let value = value
            .map(Node::describe)
            .unwrap_or_else(|| "(missing)".to_string());

        template
            .replace("{rule}", &self.id)
            .replace("{path}", path)
            .replace("{value}", &value)
            .replace("{expected}", &self.check.expectation())
    }
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
