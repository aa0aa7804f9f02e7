//! GitHub Actions output formatter
//!
//! Outputs failing outcomes as workflow commands:
//! ::warning file={name},title={rule}::{path}: {message}

use super::OutputFormatter;
use crate::outcome::{Outcome, Severity};
use crate::report::Report;

/// Formatter for GitHub Actions annotations
pub struct GithubFormatter {
    /// Whether to include summary
    pub show_summary: bool,
}

impl GithubFormatter {
    /// Create a new GitHub formatter
    pub fn new() -> Self {
        Self { show_summary: true }
    }

    /// Disable summary output
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }
}

impl Default for GithubFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Property values additionally escape the separators
fn escape_property(text: &str) -> String {
    escape(text).replace(':', "%3A").replace(',', "%2C")
}

impl OutputFormatter for GithubFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        for result in report.results() {
            for outcome in result.failures() {
                output.push_str(&self.format_outcome(&result.document, outcome));
                output.push('\n');
            }
        }

        if self.show_summary && !report.is_empty() {
            let summary = report.summarize();
            output.push_str("::group::Conformance Summary\n");
            output.push_str(&format!("Bindings checked: {}\n", report.results().len()));
            output.push_str(&format!("Passed: {}\n", summary.passed));
            output.push_str(&format!("Errors: {}\n", summary.failed_with(Severity::Error)));
            output.push_str(&format!("Warnings: {}\n", summary.failed_with(Severity::Warning)));
            output.push_str(&format!("Info: {}\n", summary.failed_with(Severity::Info)));
            output.push_str(&format!("Not evaluated: {}\n", summary.unevaluated));
            output.push_str("::endgroup::\n");
        }

        output
    }

    fn format_outcome(&self, document: &str, outcome: &Outcome) -> String {
        let level = if outcome.is_unevaluated() {
            "error"
        } else {
            match outcome.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            }
        };

        format!(
            "::{} file={},title={}::{}: {}",
            level,
            escape_property(document),
            escape_property(&outcome.rule_id),
            outcome.path,
            escape(&outcome.message)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BindingResult;

    #[test]
    fn test_format_levels() {
        let formatter = GithubFormatter::new();
        let error = Outcome::failed("r", "a", Severity::Error, "m");
        let warning = Outcome::failed("r", "a", Severity::Warning, "m");
        let info = Outcome::failed("r", "a", Severity::Info, "m");

        let output = formatter.format_outcome("docker-compose.yml", &error);
        assert_eq!(output, "::error file=docker-compose.yml,title=r::a: m");
        assert!(formatter.format_outcome("f", &warning).starts_with("::warning"));
        assert!(formatter.format_outcome("f", &info).starts_with("::notice"));
    }

    #[test]
    fn test_escape_newlines() {
        let formatter = GithubFormatter::new();
        let outcome = Outcome::failed("r", "a", Severity::Error, "Line1\nLine2");
        let output = formatter.format_outcome("f.yml", &outcome);
        assert!(output.contains("%0A"));
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_escape_properties() {
        let formatter = GithubFormatter::new();
        let outcome = Outcome::failed("a,b", "x", Severity::Error, "m: n");
        let output = formatter.format_outcome("C:\\stack\\compose.yml", &outcome);
        assert_eq!(
            output,
            "::error file=C%3A\\stack\\compose.yml,title=a%2Cb::x: m: n"
        );
    }

    #[test]
    fn test_format_report() {
        let report = Report::new(vec![BindingResult::new(
            "f.yml",
            "s",
            vec![
                Outcome::passed("ok", "a", Severity::Error, "fine"),
                Outcome::failed("bad", "b", Severity::Warning, "W"),
            ],
        )]);
        let output = GithubFormatter::new().format(&report);
        assert!(output.contains("::warning file=f.yml,title=bad::b: W"));
        assert!(!output.contains("title=ok"));
        assert!(output.contains("::group::"));
        assert!(output.contains("::endgroup::"));
    }
}
