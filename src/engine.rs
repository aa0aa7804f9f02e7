//! Evaluation engine: runs bound rule sets against documents

use crate::config::{Config, RulesConfig};
use crate::document::Document;
use crate::outcome::Outcome;
use crate::report::{BindingResult, Report};
use crate::rule_set::RuleSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document label paired with the rule set label it is checked against
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    pub document: String,
    pub rule_set: String,
}

impl Binding {
    pub fn new(document: &str, rule_set: &str) -> Self {
        Self {
            document: document.to_string(),
            rule_set: rule_set.to_string(),
        }
    }
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.document, self.rule_set)
    }
}

impl std::str::FromStr for Binding {
    type Err = String;

    /// Parse `DOCUMENT=RULE_SET`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((doc, set)) if !doc.trim().is_empty() && !set.trim().is_empty() => {
                Ok(Binding::new(doc.trim(), set.trim()))
            }
            _ => Err(format!("Invalid binding '{}': expected DOCUMENT=RULE_SET", s)),
        }
    }
}

/// Runs rule sets against documents
#[derive(Debug, Clone)]
pub struct Evaluator {
    /// Evaluate bindings on a thread pool
    parallel: bool,

    /// Pool size (0 = CPU count)
    jobs: usize,

    /// Project rule filters and severity overrides
    rules: RulesConfig,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Parallel evaluator with no rule filters
    pub fn new() -> Self {
        Self {
            parallel: true,
            jobs: 0,
            rules: RulesConfig::default(),
        }
    }

    /// Evaluator set up from the engine and rules sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.engine.parallel,
            jobs: config.engine.jobs,
            rules: config.rules.clone(),
        }
    }

    /// Builder: evaluate bindings one at a time
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Builder: set pool size
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Builder: set rule filters
    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Evaluate every binding.
    ///
    /// A binding that names a missing document or rule set yields a single
    /// unbound-target outcome; the other bindings are unaffected. Results are
    /// ordered by document label, rule set label, then binding position, so
    /// parallel and sequential runs produce the same report.
    pub fn run(
        &self,
        documents: &BTreeMap<String, Document>,
        rule_sets: &BTreeMap<String, RuleSet>,
        bindings: &[Binding],
    ) -> Report {
        let evaluate = |(position, binding): (usize, &Binding)| {
            (position, self.evaluate_binding(documents, rule_sets, binding))
        };

        let mut results: Vec<(usize, BindingResult)> = if self.parallel && bindings.len() > 1 {
            let threads = if self.jobs > 0 {
                self.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => {
                    pool.install(|| bindings.par_iter().enumerate().map(evaluate).collect())
                }
                Err(e) => {
                    log::warn!("failed to build thread pool, evaluating sequentially: {}", e);
                    bindings.iter().enumerate().map(evaluate).collect()
                }
            }
        } else {
            bindings.iter().enumerate().map(evaluate).collect()
        };

        results.sort_by(|(pa, a), (pb, b)| {
            a.document
                .cmp(&b.document)
                .then_with(|| a.rule_set.cmp(&b.rule_set))
                .then_with(|| pa.cmp(pb))
        });

        let report = Report::new(results.into_iter().map(|(_, r)| r).collect());
        log::debug!(
            "evaluated {} binding(s), {} outcome(s)",
            report.results().len(),
            report.outcomes().count()
        );
        report
    }

    fn evaluate_binding(
        &self,
        documents: &BTreeMap<String, Document>,
        rule_sets: &BTreeMap<String, RuleSet>,
        binding: &Binding,
    ) -> BindingResult {
        let document = documents.get(&binding.document);
        let rule_set = rule_sets.get(&binding.rule_set);

        let outcomes = match (document, rule_set) {
            (Some(document), Some(rule_set)) => {
                log::debug!("evaluating {}", binding);
                rule_set
                    .configured(&self.rules, &binding.document, document.source())
                    .evaluate(document)
            }
            (document, rule_set) => {
                let mut missing = Vec::new();
                if document.is_none() {
                    missing.push(format!("document '{}' is not loaded", binding.document));
                }
                if rule_set.is_none() {
                    missing.push(format!("rule set '{}' is not defined", binding.rule_set));
                }
                let message = format!("binding {}: {}", binding, missing.join(", "));
                log::warn!("{}", message);
                vec![Outcome::unbound_target("$", &message)]
            }
        };

        BindingResult::new(&binding.document, &binding.rule_set, outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Check;
    use crate::loader::{parse_str, Format};
    use crate::outcome::{Severity, Status, UNBOUND_TARGET_RULE};
    use crate::rule::Rule;
    use pretty_assertions::assert_eq;

    fn doc(text: &str) -> Document {
        parse_str(text, Format::Yaml).unwrap()
    }

    fn restart_set() -> RuleSet {
        RuleSet::from_rules(
            "compose",
            vec![Rule::new(
                "restart-policy",
                "services.*.restart",
                Check::one_of(["always", "unless-stopped", "on-failure"]),
            )
            .unwrap()
            .with_severity(Severity::Error)],
        )
        .unwrap()
    }

    fn db_set() -> RuleSet {
        RuleSet::from_rules(
            "db",
            vec![Rule::new("db-defined", "services.db", Check::Exists)
                .unwrap()
                .with_severity(Severity::Error)
                .with_message("service db must be defined")
                .required()],
        )
        .unwrap()
    }

    #[test]
    fn test_passing_rule_yields_one_outcome() {
        let documents = BTreeMap::from([(
            "compose".to_string(),
            doc("services:\n  web:\n    restart: always\n"),
        )]);
        let rule_sets = BTreeMap::from([("compose".to_string(), restart_set())]);

        let report = Evaluator::new().run(
            &documents,
            &rule_sets,
            &[Binding::new("compose", "compose")],
        );

        let outcomes: Vec<_> = report.outcomes().collect();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_passed());
        assert_eq!(outcomes[0].path, "services.web.restart");
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_required_match_missing_service() {
        let documents = BTreeMap::from([("compose".to_string(), doc("services: {}\n"))]);
        let rule_sets = BTreeMap::from([("db".to_string(), db_set())]);

        let report = Evaluator::new().run(&documents, &rule_sets, &[Binding::new("compose", "db")]);

        let outcomes: Vec<_> = report.outcomes().collect();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_passed());
        assert_eq!(outcomes[0].severity, Severity::Error);
        assert!(outcomes[0].message.contains("services.db"));
        assert!(report.has_blocking_failures());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_unbound_binding_does_not_stop_the_run() {
        let documents = BTreeMap::from([(
            "compose".to_string(),
            doc("services:\n  web:\n    restart: always\n"),
        )]);
        let rule_sets = BTreeMap::from([
            ("compose".to_string(), restart_set()),
            ("db".to_string(), db_set()),
        ]);
        let bindings = [
            Binding::new("compose", "compose"),
            Binding::new("staging", "db"),
        ];

        let report = Evaluator::new().run(&documents, &rule_sets, &bindings);

        assert_eq!(report.results().len(), 2);
        let unbound: Vec<_> = report
            .outcomes()
            .filter(|o| o.status == Status::UnboundTarget)
            .collect();
        assert_eq!(unbound.len(), 1);
        assert_eq!(unbound[0].rule_id, UNBOUND_TARGET_RULE);
        assert!(unbound[0].message.contains("staging"));

        let compose = &report.results()[0];
        assert_eq!(compose.document, "compose");
        assert!(compose.is_clean());
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_missing_rule_set_is_unbound() {
        let documents = BTreeMap::from([("compose".to_string(), doc("a: 1\n"))]);
        let report = Evaluator::new().run(
            &documents,
            &BTreeMap::new(),
            &[Binding::new("compose", "nope")],
        );
        let outcome = report.outcomes().next().unwrap();
        assert_eq!(outcome.status, Status::UnboundTarget);
        assert!(outcome.message.contains("rule set 'nope'"));
    }

    #[test]
    fn test_runs_are_deterministic_and_ordered() {
        let documents = BTreeMap::from([
            (
                "b-compose".to_string(),
                doc("services:\n  web:\n    restart: 'no'\n  db:\n    restart: always\n"),
            ),
            ("a-compose".to_string(), doc("services: {}\n")),
        ]);
        let rule_sets = BTreeMap::from([
            ("compose".to_string(), restart_set()),
            ("db".to_string(), db_set()),
        ]);
        let bindings = [
            Binding::new("b-compose", "db"),
            Binding::new("b-compose", "compose"),
            Binding::new("a-compose", "db"),
            Binding::new("missing", "compose"),
        ];

        let sequential = Evaluator::new().sequential().run(&documents, &rule_sets, &bindings);
        let parallel = Evaluator::new()
            .with_jobs(4)
            .run(&documents, &rule_sets, &bindings);
        let again = Evaluator::new()
            .with_jobs(2)
            .run(&documents, &rule_sets, &bindings);

        assert_eq!(sequential, parallel);
        assert_eq!(parallel, again);
        assert_eq!(sequential.to_value(), parallel.to_value());

        let order: Vec<_> = sequential
            .results()
            .iter()
            .map(|r| (r.document.as_str(), r.rule_set.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a-compose", "db"),
                ("b-compose", "compose"),
                ("b-compose", "db"),
                ("missing", "compose"),
            ]
        );
    }

    #[test]
    fn test_rule_filters_apply_per_binding() {
        let documents = BTreeMap::from([("compose".to_string(), doc("services: {}\n"))]);
        let rule_sets = BTreeMap::from([("db".to_string(), db_set())]);

        let mut rules = RulesConfig::default();
        rules.severity.insert("db-defined".to_string(), Severity::Warning);
        let report = Evaluator::new()
            .with_rules(rules)
            .run(&documents, &rule_sets, &[Binding::new("compose", "db")]);
        assert!(!report.has_blocking_failures());

        let mut rules = RulesConfig::default();
        rules.disabled.push("db-defined".to_string());
        let report = Evaluator::new()
            .with_rules(rules)
            .run(&documents, &rule_sets, &[Binding::new("compose", "db")]);
        assert_eq!(report.outcomes().count(), 0);
    }

    #[test]
    fn test_binding_from_str() {
        assert_eq!(
            "compose=compose".parse::<Binding>(),
            Ok(Binding::new("compose", "compose"))
        );
        assert!("compose".parse::<Binding>().is_err());
        assert!("=x".parse::<Binding>().is_err());
    }
}
