//! JSON output formatter

use super::OutputFormatter;
use crate::outcome::Outcome;
use crate::report::Report;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    document: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        self.render(report)
    }

    fn format_outcome(&self, document: &str, outcome: &Outcome) -> String {
        self.render(&JsonOutcome { document, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Severity;
    use crate::report::BindingResult;

    #[test]
    fn test_json_format_outcome() {
        let formatter = JsonFormatter::new();
        let outcome = Outcome::failed("test-rule", "a.b", Severity::Error, "Test message");

        let output = formatter.format_outcome("f.yml", &outcome);
        assert!(output.contains("\"document\":\"f.yml\""));
        assert!(output.contains("\"rule_id\":\"test-rule\""));
        assert!(output.contains("\"severity\":\"error\""));
        assert!(output.contains("\"status\":\"failed\""));
    }

    #[test]
    fn test_json_format_report() {
        let report = Report::new(vec![BindingResult::new(
            "f.yml",
            "s",
            vec![Outcome::passed("r", "a", Severity::Warning, "ok")],
        )]);

        let output = JsonFormatter::new().format(&report);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["results"][0]["rule_set"], "s");
    }

    #[test]
    fn test_json_pretty() {
        let formatter = JsonFormatter::new().pretty();
        let output = formatter.format(&Report::default());
        assert!(output.contains('\n'));
    }
}
