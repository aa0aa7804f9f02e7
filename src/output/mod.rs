//! Output formatters for reports

mod compact;
mod github;
mod json;
mod junit;
mod text;

pub use compact::CompactFormatter;
pub use github::GithubFormatter;
pub use json::JsonFormatter;
pub use junit::JUnitFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::outcome::Outcome;
use crate::report::Report;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire report
    fn format(&self, report: &Report) -> String;

    /// Format a single outcome of the given document
    fn format_outcome(&self, document: &str, outcome: &Outcome) -> String;
}

/// Formatter for the configured output format
pub fn formatter(format: OutputFormat, colored: bool, verbose: bool, stats: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let mut text = TextFormatter::new();
            if !colored {
                text = text.without_color();
            }
            if verbose {
                text = text.verbose();
            }
            if !stats {
                text = text.without_stats();
            }
            Box::new(text)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Github if stats => Box::new(GithubFormatter::new()),
        OutputFormat::Github => Box::new(GithubFormatter::new().without_summary()),
        OutputFormat::Compact => Box::new(CompactFormatter::new()),
        OutputFormat::Junit => Box::new(JUnitFormatter::new()),
    }
}
