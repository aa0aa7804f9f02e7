//! Outcome types for rule evaluation results

use serde::{Deserialize, Serialize};

/// Severity level for outcomes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// What happened when a rule met a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The check held
    Passed,
    /// The check did not hold: a configuration defect
    Failed,
    /// The check itself broke (type mismatch, bad regex, panic)
    PredicateError,
    /// The binding named a document or rule set that does not exist
    UnboundTarget,
}

impl Status {
    /// Whether the rule could not be evaluated at all
    pub fn is_unevaluated(self) -> bool {
        matches!(self, Status::PredicateError | Status::UnboundTarget)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
            Status::PredicateError => write!(f, "predicate error"),
            Status::UnboundTarget => write!(f, "unbound target"),
        }
    }
}

/// Result of evaluating one rule at one matched location.
///
/// Serializes with a derived `passed` flag next to `status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Outcome {
    /// Rule ID that produced this outcome
    pub rule_id: String,
    /// Concrete path of the match, or the pattern text when nothing matched
    pub path: String,
    /// Severity level
    pub severity: Severity,
    /// Evaluation status
    pub status: Status,
    /// Human-readable message
    pub message: String,
}

impl Outcome {
    /// Create a new outcome
    pub fn new(rule_id: &str, path: &str, severity: Severity, status: Status, message: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            path: path.to_string(),
            severity,
            status,
            message: message.to_string(),
        }
    }

    pub fn passed(rule_id: &str, path: &str, severity: Severity, message: &str) -> Self {
        Self::new(rule_id, path, severity, Status::Passed, message)
    }

    pub fn failed(rule_id: &str, path: &str, severity: Severity, message: &str) -> Self {
        Self::new(rule_id, path, severity, Status::Failed, message)
    }

    /// A broken predicate always reports at error severity
    pub fn predicate_error(rule_id: &str, path: &str, message: &str) -> Self {
        Self::new(rule_id, path, Severity::Error, Status::PredicateError, message)
    }

    pub fn unbound_target(path: &str, message: &str) -> Self {
        Self::new(
            UNBOUND_TARGET_RULE,
            path,
            Severity::Error,
            Status::UnboundTarget,
            message,
        )
    }

    pub fn is_passed(&self) -> bool {
        self.status == Status::Passed
    }

    /// Failing outcome at error severity; these decide the exit status
    pub fn is_blocking(&self) -> bool {
        !self.is_passed() && self.severity == Severity::Error
    }

    pub fn is_unevaluated(&self) -> bool {
        self.status.is_unevaluated()
    }
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    rule_id: &'a str,
    path: &'a str,
    severity: Severity,
    passed: bool,
    status: Status,
    message: &'a str,
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeView {
            rule_id: &self.rule_id,
            path: &self.path,
            severity: self.severity,
            passed: self.is_passed(),
            status: self.status,
            message: &self.message,
        }
        .serialize(serializer)
    }
}

/// Rule id carried by outcomes for misconfigured bindings
pub const UNBOUND_TARGET_RULE: &str = "unbound-target";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("hint".parse::<Severity>(), Ok(Severity::Info));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(format!("{}", Severity::Error), "error");
        assert_eq!(format!("{}", Severity::Warning), "warning");
        assert_eq!(format!("{}", Severity::Info), "info");
    }

    #[test]
    fn test_blocking_requires_error_severity() {
        let warn = Outcome::failed("r", "a", Severity::Warning, "m");
        assert!(!warn.is_passed());
        assert!(!warn.is_blocking());

        let err = Outcome::failed("r", "a", Severity::Error, "m");
        assert!(err.is_blocking());

        let ok = Outcome::passed("r", "a", Severity::Error, "m");
        assert!(!ok.is_blocking());
    }

    #[test]
    fn test_unevaluated_outcomes_are_errors() {
        let broken = Outcome::predicate_error("r", "a", "bad regex");
        assert_eq!(broken.severity, Severity::Error);
        assert!(broken.is_unevaluated());
        assert!(broken.is_blocking());

        let unbound = Outcome::unbound_target("compose", "no such document");
        assert_eq!(unbound.rule_id, UNBOUND_TARGET_RULE);
        assert_eq!(unbound.status, Status::UnboundTarget);
    }

    #[test]
    fn test_outcome_serializes_passed_flag() {
        let ok = serde_json::to_value(Outcome::passed("r", "a", Severity::Info, "m")).unwrap();
        assert_eq!(ok["passed"], true);
        assert_eq!(ok["status"], "passed");

        let broken = Outcome::predicate_error("r", "a", "bad");
        let value = serde_json::to_value(&broken).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["status"], "predicate_error");

        let back: Outcome = serde_json::from_value(value).unwrap();
        assert_eq!(back, broken);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::PredicateError).unwrap();
        assert_eq!(json, "\"predicate_error\"");
    }
}
