//! JUnit XML output formatter
//!
//! One test suite per binding, one test case per outcome.

use super::OutputFormatter;
use crate::outcome::{Outcome, Status};
use crate::report::Report;

/// Formatter for JUnit XML output
pub struct JUnitFormatter {
    /// Name of the enclosing `<testsuites>` element
    pub suite_name: String,
}

impl JUnitFormatter {
    /// Create a new JUnit formatter
    pub fn new() -> Self {
        Self {
            suite_name: "conform".to_string(),
        }
    }

    /// Set the test suite name
    pub fn with_suite_name(mut self, name: &str) -> Self {
        self.suite_name = name.to_string();
        self
    }

    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

impl Default for JUnitFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JUnitFormatter {
    fn format(&self, report: &Report) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let summary = report.summarize();
        xml.push_str(&format!(
            "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\">\n",
            Self::escape_xml(&self.suite_name),
            summary.total,
            summary.failed(),
            summary.unevaluated
        ));

        for result in report.results() {
            let failures = result
                .outcomes
                .iter()
                .filter(|o| o.status == Status::Failed)
                .count();
            let errors = result.outcomes.iter().filter(|o| o.is_unevaluated()).count();

            xml.push_str(&format!(
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\">\n",
                Self::escape_xml(&format!("{} ({})", result.document, result.rule_set)),
                result.outcomes.len(),
                failures,
                errors
            ));
            for outcome in &result.outcomes {
                xml.push_str("    ");
                xml.push_str(&self.format_outcome(&result.document, outcome));
                xml.push('\n');
            }
            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    fn format_outcome(&self, document: &str, outcome: &Outcome) -> String {
        let open = format!(
            "<testcase name=\"{}\" classname=\"{}\"",
            Self::escape_xml(&format!("{} {}", outcome.rule_id, outcome.path)),
            Self::escape_xml(document)
        );
        let element = match outcome.status {
            Status::Passed => return format!("{} />", open),
            Status::Failed => "failure",
            Status::PredicateError | Status::UnboundTarget => "error",
        };
        format!(
            "{}><{} type=\"{}\" message=\"{}\" /></testcase>",
            open,
            element,
            outcome.severity,
            Self::escape_xml(&outcome.message)
        )
    }
}
