//! End-to-end checks over the homelab fixture tree

use conform::builtin;
use conform::{
    load_documents, Binding, Config, Detector, Evaluator, JsonFormatter, OutputFormatter,
    Parameters, Report, RuleSet, Severity, Status, UNBOUND_TARGET_RULE,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn homelab() -> PathBuf {
    fixtures().join("homelab")
}

/// Every detectable file under the homelab fixture, labelled by relative path
fn homelab_stack() -> (BTreeMap<String, PathBuf>, Vec<Binding>) {
    let root = homelab();
    let detector = Detector::new(&BTreeMap::new()).unwrap();
    let pattern = format!("{}/**/*.y*ml", root.display());

    let mut files = BTreeMap::new();
    let mut bindings = Vec::new();
    for path in glob::glob(&pattern).unwrap().flatten() {
        let relative = path.strip_prefix(&root).unwrap().to_path_buf();
        if let Some(set) = detector.detect(&relative) {
            let label = relative.to_string_lossy().replace('\\', "/");
            bindings.push(Binding::new(&label, set));
            files.insert(label, path);
        }
    }
    (files, bindings)
}

fn failures(report: &Report) -> Vec<String> {
    report
        .outcomes()
        .filter(|o| !o.is_passed())
        .map(|o| o.rule_id.clone())
        .collect()
}

fn run_stack(evaluator: &Evaluator) -> Report {
    let (files, bindings) = homelab_stack();
    let (documents, errors) = load_documents(&files);
    assert!(errors.is_empty(), "load errors: {:?}", errors);
    let rule_sets = builtin::all(&Parameters::default()).unwrap();
    evaluator.run(&documents, &rule_sets, &bindings)
}

#[test]
fn test_homelab_stack_conforms() {
    let (_, bindings) = homelab_stack();
    let mut sets: Vec<&str> = bindings.iter().map(|b| b.rule_set.as_str()).collect();
    sets.sort();
    let mut expected = builtin::NAMES.to_vec();
    expected.sort();
    assert_eq!(sets, expected);

    let report = run_stack(&Evaluator::new());
    assert_eq!(failures(&report), Vec::<String>::new());
    assert_eq!(report.results().len(), builtin::NAMES.len());
    assert!(report.results().iter().all(|r| !r.outcomes.is_empty()));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_parallel_matches_sequential() {
    let parallel = run_stack(&Evaluator::new().with_jobs(4));
    let sequential = run_stack(&Evaluator::new().sequential());
    assert_eq!(parallel.to_value(), sequential.to_value());
}

fn broken_compose(dir: &TempDir) -> PathBuf {
    let original = fs::read_to_string(homelab().join("docker-compose.yml")).unwrap();
    let broken = original
        .replacen("network_mode: service:surfshark", "network_mode: host", 1)
        .replace("mem_limit: 768m", "mem_limit: 2g");
    let path = dir.path().join("docker-compose.yml");
    fs::write(&path, broken).unwrap();
    path
}

#[test]
fn test_broken_compose_blocks() {
    let dir = TempDir::new().unwrap();
    let files = BTreeMap::from([("compose".to_string(), broken_compose(&dir))]);
    let (documents, errors) = load_documents(&files);
    assert!(errors.is_empty());

    let bindings = vec![Binding::new("compose", "compose")];
    let rule_sets = builtin::all(&Parameters::default()).unwrap();
    let report = Evaluator::new().run(&documents, &rule_sets, &bindings);

    assert_eq!(
        failures(&report),
        vec!["compose-vpn-client-qbittorrent-route", "compose-kopia-memory-limit"]
    );
    let route = report
        .outcomes()
        .find(|o| o.rule_id == "compose-vpn-client-qbittorrent-route")
        .unwrap();
    assert_eq!(route.path, "services.qbittorrent.network_mode");
    assert_eq!(route.severity, Severity::Error);
    assert_eq!(report.exit_code(), 1);

    // A looser memory budget lets the 2g limit through
    let lenient = Parameters {
        memory_tolerance: 3.0,
        ..Parameters::default()
    };
    let rule_sets = builtin::all(&lenient).unwrap();
    let report = Evaluator::new().run(&documents, &rule_sets, &bindings);
    assert_eq!(failures(&report), vec!["compose-vpn-client-qbittorrent-route"]);
}

#[test]
fn test_disabled_and_ignored_rules_are_skipped() {
    let dir = TempDir::new().unwrap();
    let files = BTreeMap::from([("compose".to_string(), broken_compose(&dir))]);
    let (documents, _) = load_documents(&files);
    let rule_sets = builtin::all(&Parameters::default()).unwrap();

    let mut config = Config::new();
    config.merge_cli(
        None,
        None,
        None,
        Some(vec!["compose-kopia-memory-limit".to_string()]),
    );
    config.add_ignore_prefixes(vec!["compose-vpn".to_string()]);

    let report = Evaluator::from_config(&config).run(
        &documents,
        &rule_sets,
        &[Binding::new("compose", "compose")],
    );
    assert_eq!(failures(&report), Vec::<String>::new());
    assert!(report
        .outcomes()
        .all(|o| !o.rule_id.starts_with("compose-vpn")));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_unbound_bindings() {
    let files = BTreeMap::from([(
        "compose".to_string(),
        homelab().join("docker-compose.yml"),
    )]);
    let (documents, _) = load_documents(&files);
    let rule_sets = builtin::all(&Parameters::default()).unwrap();
    let bindings = vec![
        Binding::new("compose", "compose"),
        Binding::new("compose", "kubernetes"),
        Binding::new("loki", "loki"),
    ];

    let report = Evaluator::new().run(&documents, &rule_sets, &bindings);
    assert_eq!(report.results().len(), 3);

    let unbound: Vec<_> = report
        .outcomes()
        .filter(|o| o.status == Status::UnboundTarget)
        .collect();
    assert_eq!(unbound.len(), 2);
    assert!(unbound.iter().all(|o| o.rule_id == UNBOUND_TARGET_RULE));
    assert!(unbound.iter().any(|o| o.message.contains("'kubernetes'")));
    assert!(unbound.iter().any(|o| o.message.contains("'loki' is not loaded")));

    let bound = report
        .results()
        .iter()
        .find(|r| r.rule_set == "compose")
        .unwrap();
    assert!(bound.is_clean());
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn test_missing_document_is_a_load_error() {
    let files = BTreeMap::from([
        ("compose".to_string(), homelab().join("docker-compose.yml")),
        ("gone".to_string(), homelab().join("missing.yml")),
    ]);
    let (documents, errors) = load_documents(&files);
    assert_eq!(documents.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "gone");
}

#[test]
fn test_custom_rule_file() {
    let set = RuleSet::load(&fixtures().join("rules").join("house-rules.yml")).unwrap();
    assert_eq!(set.name(), "house-rules");
    assert_eq!(set.len(), 3);
    assert_eq!(set.get("house-pinned-tag").unwrap().severity, Severity::Info);
    assert!(set.get("house-vpn-healthcheck").unwrap().require_match);
}

#[test]
fn test_config_fixture_end_to_end() {
    let config = Config::load(&homelab().join("conform.yaml")).unwrap();
    assert_eq!(config.engine.jobs, 2);
    assert_eq!(config.bindings.len(), 4);
    assert!(config.documents.values().all(|p| p.exists()));

    let params = config.parameters().unwrap();
    assert_eq!(params.memory_tolerance, 1.5);
    assert_eq!(params.host, "lepotato");

    let mut rule_sets = builtin::all(&params).unwrap();
    for (label, path) in &config.rule_sets {
        rule_sets.insert(label.clone(), RuleSet::load(path).unwrap());
    }

    let (documents, errors) = load_documents(&config.documents);
    assert!(errors.is_empty());

    let report = Evaluator::from_config(&config).run(&documents, &rule_sets, &config.bindings);
    let order: Vec<(&str, &str)> = report
        .results()
        .iter()
        .map(|r| (r.document.as_str(), r.rule_set.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("alerts", "prometheus-alerts"),
            ("compose", "compose"),
            ("compose", "house"),
            ("prometheus", "prometheus"),
        ]
    );

    // Every image but the database floats on :latest
    let floating: Vec<_> = report.outcomes().filter(|o| !o.is_passed()).collect();
    assert_eq!(floating.len(), 19);
    assert!(floating
        .iter()
        .all(|o| o.rule_id == "house-pinned-tag" && o.severity == Severity::Warning));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_json_report() {
    let dir = TempDir::new().unwrap();
    let files = BTreeMap::from([("compose".to_string(), broken_compose(&dir))]);
    let (documents, _) = load_documents(&files);
    let rule_sets = builtin::all(&Parameters::default()).unwrap();
    let report = Evaluator::new().run(&documents, &rule_sets, &[Binding::new("compose", "compose")]);

    let output = JsonFormatter::new().pretty().format(&report);
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["results"][0]["document"], "compose");
    assert_eq!(value["results"][0]["rule_set"], "compose");
    assert_eq!(value["summary"]["failed_by_severity"]["error"], 1);
    assert_eq!(value["summary"]["failed_by_severity"]["warning"], 1);
    assert_eq!(value, report.to_value());
}
