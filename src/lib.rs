//! Conform - rule-driven conformance checking for configuration files
//!
//! Loads YAML/JSON documents into an immutable tree, evaluates named rule sets
//! against them and aggregates the outcomes into a report.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Evaluator -> Binding -> RuleSet -> Rule -> Check -> Document
//! ```
//!
//! Bindings pair a document label with a rule set label. Every rule resolves
//! its path pattern against the document and applies its check at each match;
//! a broken check becomes an outcome instead of aborting the run.
//!
//! # Rule files
//!
//! Rule sets can be written as YAML (or JSON):
//!
//! ```yaml
//! name: compose-house-rules
//! rules:
//!   - id: restart-policy
//!     pattern: "services.*"
//!     severity: error
//!     check:
//!       type: at
//!       path: restart
//!       then: { type: one_of, values: [always, unless-stopped] }
//!     message: "{path} must declare a restart policy"
//! ```

pub mod builtin;
pub mod check;
pub mod config;
pub mod document;
pub mod engine;
pub mod loader;
pub mod outcome;
pub mod output;
pub mod report;
pub mod rule;
pub mod rule_set;

// Re-export main types
pub use builtin::{Detector, Parameters};
pub use check::{Check, MatchContext, PredicateError};
pub use config::{Config, ConfigError, RulesConfig};
pub use document::{Document, Mapping, Node, NodeKind, NodePath, PathError, PathPattern, Scalar};
pub use engine::{Binding, Evaluator};
pub use loader::{load_document, load_documents, parse_str, Format, ParseError};
pub use outcome::{Outcome, Severity, Status, UNBOUND_TARGET_RULE};
pub use output::{
    CompactFormatter, GithubFormatter, JUnitFormatter, JsonFormatter, OutputFormatter,
    TextFormatter,
};
pub use report::{BindingResult, Report, Summary};
pub use rule::Rule;
pub use rule_set::{RuleSet, RuleSetError, RuleSetFile};
