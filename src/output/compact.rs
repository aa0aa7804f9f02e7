//! Compact output formatter
//!
//! One line per failing outcome, minimal output for scripting.

use super::OutputFormatter;
use crate::outcome::{Outcome, Status};
use crate::report::Report;

/// Compact one-line-per-failure formatter
pub struct CompactFormatter {
    /// Show severity prefix
    pub show_severity: bool,
    /// Show rule ID
    pub show_rule: bool,
}

impl CompactFormatter {
    /// Create a new compact formatter
    pub fn new() -> Self {
        Self {
            show_severity: true,
            show_rule: true,
        }
    }

    /// Hide severity prefix
    pub fn without_severity(mut self) -> Self {
        self.show_severity = false;
        self
    }

    /// Hide rule ID
    pub fn without_rule(mut self) -> Self {
        self.show_rule = false;
        self
    }
}

impl Default for CompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CompactFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        for result in report.results() {
            for outcome in result.failures() {
                output.push_str(&self.format_outcome(&result.document, outcome));
                output.push('\n');
            }
        }

        output
    }

    fn format_outcome(&self, document: &str, outcome: &Outcome) -> String {
        let mut parts = vec![format!("{}:{}", document, outcome.path)];

        if self.show_severity {
            parts.push(match outcome.status {
                Status::Passed | Status::Failed => outcome.severity.to_string(),
                Status::PredicateError | Status::UnboundTarget => outcome.status.to_string(),
            });
        }

        if self.show_rule {
            parts.push(outcome.rule_id.clone());
        }

        parts.push(outcome.message.clone());

        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Severity;
    use crate::report::BindingResult;

    #[test]
    fn test_compact_format() {
        let formatter = CompactFormatter::new();
        let outcome = Outcome::failed(
            "loki-auth-disabled",
            "auth_enabled",
            Severity::Error,
            "auth_enabled must equal 'false'",
        );
        assert_eq!(
            formatter.format_outcome("loki.yml", &outcome),
            "loki.yml:auth_enabled: error: loki-auth-disabled: auth_enabled must equal 'false'"
        );
    }

    #[test]
    fn test_compact_minimal() {
        let formatter = CompactFormatter::new().without_severity().without_rule();
        let outcome = Outcome::predicate_error("r", "a.b", "bad");
        assert_eq!(formatter.format_outcome("f.yml", &outcome), "f.yml:a.b: bad");
    }

    #[test]
    fn test_compact_skips_passed() {
        let report = Report::new(vec![BindingResult::new(
            "f.yml",
            "s",
            vec![
                Outcome::passed("r1", "a", Severity::Error, "ok"),
                Outcome::failed("r2", "b", Severity::Warning, "W"),
                Outcome::predicate_error("r3", "c", "E"),
            ],
        )]);
        let output = CompactFormatter::new().format(&report);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines, vec!["f.yml:b: warning: r2: W", "f.yml:c: predicate error: r3: E"]);
    }
}
