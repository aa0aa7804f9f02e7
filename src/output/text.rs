//! Human-readable text output formatter

use super::OutputFormatter;
use crate::outcome::{Outcome, Severity, Status};
use crate::report::Report;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// List passed outcomes too
    pub show_passed: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_passed: false,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Include passed outcomes
    pub fn verbose(mut self) -> Self {
        self.show_passed = true;
        self
    }

    /// Omit the statistics line
    pub fn without_stats(mut self) -> Self {
        self.show_stats = false;
        self
    }

    fn label(&self, outcome: &Outcome) -> ColoredString {
        let s = match outcome.status {
            Status::Passed => "ok".to_string(),
            Status::Failed => outcome.severity.to_string(),
            Status::PredicateError | Status::UnboundTarget => outcome.status.to_string(),
        };
        if !self.colored {
            return s.normal();
        }
        match (outcome.status, outcome.severity) {
            (Status::Passed, _) => s.green(),
            (Status::PredicateError | Status::UnboundTarget, _) => s.magenta().bold(),
            (Status::Failed, Severity::Error) => s.red().bold(),
            (Status::Failed, Severity::Warning) => s.yellow().bold(),
            (Status::Failed, Severity::Info) => s.blue(),
        }
    }

    fn count(&self, n: usize, singular: &str, plural: &str, paint: fn(&str) -> ColoredString) -> String {
        let s = format!("{} {}", n, if n == 1 { singular } else { plural });
        if self.colored {
            paint(&s).to_string()
        } else {
            s
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        for result in report.results() {
            let shown: Vec<_> = result
                .outcomes
                .iter()
                .filter(|o| self.show_passed || !o.is_passed())
                .collect();
            if shown.is_empty() {
                continue;
            }

            let header = format!("{} ({})", result.document, result.rule_set);
            if self.colored {
                output.push_str(&format!("{}\n", header.underline()));
            } else {
                output.push_str(&format!("{}\n", header));
            }

            for outcome in shown {
                output.push_str(&self.format_outcome(&result.document, outcome));
                output.push('\n');
            }
            output.push('\n');
        }

        // Statistics
        if self.show_stats {
            let summary = report.summarize();
            output.push_str(&format!(
                "{} {} checked, {} passed",
                report.results().len(),
                if report.results().len() == 1 {
                    "binding"
                } else {
                    "bindings"
                },
                summary.passed
            ));

            let mut counts = Vec::new();
            let errors = summary.failed_with(Severity::Error);
            if errors > 0 {
                counts.push(self.count(errors, "error", "errors", |s| s.red()));
            }
            let warnings = summary.failed_with(Severity::Warning);
            if warnings > 0 {
                counts.push(self.count(warnings, "warning", "warnings", |s| s.yellow()));
            }
            let infos = summary.failed_with(Severity::Info);
            if infos > 0 {
                counts.push(self.count(infos, "info", "infos", |s| s.blue()));
            }
            if summary.unevaluated > 0 {
                counts.push(self.count(
                    summary.unevaluated,
                    "not evaluated",
                    "not evaluated",
                    |s| s.magenta(),
                ));
            }

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');
        }

        output
    }

    fn format_outcome(&self, _document: &str, outcome: &Outcome) -> String {
        format!(
            "  {} {}[{}]: {}",
            outcome.path,
            self.label(outcome),
            if self.colored {
                outcome.rule_id.cyan().to_string()
            } else {
                outcome.rule_id.clone()
            },
            outcome.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BindingResult;

    fn report() -> Report {
        Report::new(vec![
            BindingResult::new(
                "docker-compose.yml",
                "compose",
                vec![
                    Outcome::passed("compose-version", "version", Severity::Warning, "ok"),
                    Outcome::failed(
                        "compose-restart-policy",
                        "services.web",
                        Severity::Error,
                        "services.web must set restart",
                    ),
                ],
            ),
            BindingResult::new(
                "loki.yml",
                "loki",
                vec![Outcome::passed("loki-http-port", "server.http_listen_port", Severity::Error, "ok")],
            ),
        ])
    }

    #[test]
    fn test_format_outcome() {
        let formatter = TextFormatter::new().without_color();
        let outcome = Outcome::failed("r", "services.web", Severity::Error, "broken");
        assert_eq!(
            formatter.format_outcome("docker-compose.yml", &outcome),
            "  services.web error[r]: broken"
        );
    }

    #[test]
    fn test_failures_only_by_default() {
        let output = TextFormatter::new().without_color().format(&report());
        assert!(output.contains("docker-compose.yml (compose)"));
        assert!(output.contains("compose-restart-policy"));
        assert!(!output.contains("compose-version"));
        assert!(!output.contains("loki.yml"));
        assert!(output.contains("2 bindings checked, 2 passed: 1 error"));
    }

    #[test]
    fn test_verbose_lists_passed() {
        let output = TextFormatter::new().without_color().verbose().format(&report());
        assert!(output.contains("ok[compose-version]"));
        assert!(output.contains("loki.yml (loki)"));
    }

    #[test]
    fn test_without_stats() {
        let output = TextFormatter::new().without_color().without_stats().format(&report());
        assert!(output.contains("compose-restart-policy"));
        assert!(!output.contains("bindings checked"));
    }
}
