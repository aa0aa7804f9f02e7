//! Aggregated results of a run

use crate::outcome::{Outcome, Severity, Status};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcomes of one rule set evaluated against one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingResult {
    /// Document label
    pub document: String,
    /// Rule set label
    pub rule_set: String,
    /// Outcomes in rule order
    pub outcomes: Vec<Outcome>,
}

impl BindingResult {
    pub fn new(document: &str, rule_set: &str, outcomes: Vec<Outcome>) -> Self {
        Self {
            document: document.to_string(),
            rule_set: rule_set.to_string(),
            outcomes,
        }
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_passed()).count()
    }

    /// Outcomes that did not pass, in order
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_passed())
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_passed)
    }
}

/// Outcome counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    /// Failed outcomes (status `failed`) per severity; every level present
    pub failed_by_severity: BTreeMap<Severity, usize>,
    /// Predicate errors and unbound targets
    pub unevaluated: usize,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total: 0,
            passed: 0,
            failed_by_severity: [Severity::Info, Severity::Warning, Severity::Error]
                .into_iter()
                .map(|s| (s, 0))
                .collect(),
            unevaluated: 0,
        }
    }
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.failed_by_severity.values().sum()
    }

    pub fn failed_with(&self, severity: Severity) -> usize {
        self.failed_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Result of evaluating every binding of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    results: Vec<BindingResult>,
}

impl Report {
    /// Results must already be in their final order
    pub fn new(results: Vec<BindingResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[BindingResult] {
        &self.results
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter().flat_map(|r| r.outcomes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn summarize(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in self.outcomes() {
            summary.total += 1;
            match outcome.status {
                Status::Passed => summary.passed += 1,
                Status::Failed => {
                    *summary
                        .failed_by_severity
                        .entry(outcome.severity)
                        .or_insert(0) += 1
                }
                Status::PredicateError | Status::UnboundTarget => summary.unevaluated += 1,
            }
        }
        summary
    }

    /// Whether some outcome at error severity did not pass
    pub fn has_blocking_failures(&self) -> bool {
        self.outcomes().any(Outcome::is_blocking)
    }

    pub fn has_unbound_targets(&self) -> bool {
        self.outcomes().any(|o| o.status == Status::UnboundTarget)
    }

    /// 2 for a misconfigured run, 1 for blocking failures, else 0
    pub fn exit_code(&self) -> i32 {
        if self.has_unbound_targets() {
            2
        } else if self.has_blocking_failures() {
            1
        } else {
            0
        }
    }

    /// Plain nested value: `{results: [...], summary: {...}}`
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct ReportView<'a> {
    results: &'a [BindingResult],
    summary: Summary,
}

impl Serialize for Report {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportView {
            results: &self.results,
            summary: self.summarize(),
        }
        .serialize(serializer)
    }
}
