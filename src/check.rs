//! Predicate vocabulary for rules
//!
//! A [`Check`] is the data form of a rule predicate. Every variant except
//! [`Check::Custom`] can be written in a rule file:
//!
//! ```yaml
//! check:
//!   type: one_of
//!   values: [always, unless-stopped, on-failure]
//! ```

use crate::document::{Document, Node, NodeKind, NodePath, Scalar};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A check that could not be evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: NodeKind },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("cannot interpret '{value}' as {expected}")]
    InvalidValue { value: String, expected: String },

    #[error("predicate panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Custom(String),
}

impl PredicateError {
    fn mismatch(expected: &str, node: &Node) -> Self {
        PredicateError::TypeMismatch {
            expected: expected.to_string(),
            found: node.kind(),
        }
    }
}

/// Where a check is being applied
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// The whole document, for checks that look elsewhere
    pub document: &'a Document,
    /// Concrete path of the node under test
    pub path: &'a NodePath,
}

pub type PredicateFn =
    dyn Fn(&Node, &MatchContext<'_>) -> Result<bool, PredicateError> + Send + Sync;

/// Host-supplied predicate
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    func: Arc<PredicateFn>,
}

impl CustomPredicate {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Node, &MatchContext<'_>) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, node: &Node, ctx: &MatchContext<'_>) -> Result<bool, PredicateError> {
        (self.func)(node, ctx)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Predicate applied to each node matched by a rule's pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// The node is present (any value, including null)
    Exists,

    /// Scalar equal to `value`; numbers compare numerically
    Equals { value: Scalar },

    /// Scalar equal to one of `values`
    OneOf { values: Vec<Scalar> },

    /// Scalar text matches a regular expression
    Matches { pattern: String },

    /// Scalar text contains a substring
    ContainsText { text: String },

    /// Sequence holds a scalar equal to `value`
    Contains { value: Scalar },

    /// Some sequence element contains every one of `texts`
    AnyItemContains { texts: Vec<String> },

    /// Sequence contains `name`, or mapping has key `name`
    Includes { name: String },

    /// Mapping has key `key`
    HasKey { key: String },

    /// Collection or string with at least one element
    NonEmpty,

    /// Node is of the given kind
    Kind { kind: NodeKind },

    /// Number within inclusive bounds
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },

    /// Compose memory value (`512m`, `1g`, bytes) not above `max_mb` megabytes
    MemoryAtMost { max_mb: f64 },

    /// Every reference held by the node is a key of the mapping at `within`
    Refers {
        within: NodePath,
        #[serde(default)]
        prefix: Option<String>,
    },

    /// Relative lookup; a missing node fails
    At { path: NodePath, then: Box<Check> },

    /// Some sequence element satisfies `check`
    AnyItem { check: Box<Check> },

    /// Sequence element whose `field` equals `equals`
    Item {
        field: String,
        equals: Scalar,
        #[serde(default)]
        at: Option<NodePath>,
        #[serde(default)]
        then: Option<Box<Check>>,
    },

    Not { inner: Box<Check> },

    AllOf { checks: Vec<Check> },

    AnyOf { checks: Vec<Check> },

    #[serde(skip)]
    Custom(CustomPredicate),
}

impl Check {
    pub fn custom<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Node, &MatchContext<'_>) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Check::Custom(CustomPredicate::new(name, func))
    }

    pub fn equals(value: impl Into<Scalar>) -> Self {
        Check::Equals {
            value: value.into(),
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        Check::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(value: impl Into<Scalar>) -> Self {
        Check::Contains {
            value: value.into(),
        }
    }

    pub fn contains_text(text: &str) -> Self {
        Check::ContainsText {
            text: text.to_string(),
        }
    }

    pub fn any_item_contains(texts: &[&str]) -> Self {
        Check::AnyItemContains {
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn includes(name: &str) -> Self {
        Check::Includes {
            name: name.to_string(),
        }
    }

    pub fn has_key(key: &str) -> Self {
        Check::HasKey {
            key: key.to_string(),
        }
    }

    pub fn at(path: NodePath, then: Check) -> Self {
        Check::At {
            path,
            then: Box::new(then),
        }
    }

    pub fn negate(inner: Check) -> Self {
        Check::Not {
            inner: Box::new(inner),
        }
    }

    /// Apply the check to a matched node
    pub fn test(&self, node: &Node, ctx: &MatchContext<'_>) -> Result<bool, PredicateError> {
        match self {
            Check::Exists => Ok(true),

            Check::Equals { value } => Ok(node.as_scalar().is_some_and(|s| s.loosely_equals(value))),

            Check::OneOf { values } => Ok(node
                .as_scalar()
                .is_some_and(|s| values.iter().any(|v| s.loosely_equals(v)))),

            Check::Matches { pattern } => {
                let text = scalar_text(node)?;
                let re = Regex::new(pattern).map_err(|e| PredicateError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(re.is_match(&text))
            }

            Check::ContainsText { text } => Ok(scalar_text(node)?.contains(text.as_str())),

            Check::Contains { value } => {
                let items = node
                    .as_sequence()
                    .ok_or_else(|| PredicateError::mismatch("sequence", node))?;
                Ok(items
                    .iter()
                    .filter_map(Node::as_scalar)
                    .any(|s| s.loosely_equals(value)))
            }

            Check::AnyItemContains { texts } => {
                let items = node
                    .as_sequence()
                    .ok_or_else(|| PredicateError::mismatch("sequence", node))?;
                Ok(items.iter().filter_map(item_text).any(|item| {
                    texts.iter().all(|t| item.contains(t.as_str()))
                }))
            }

            Check::Includes { name } => match node {
                Node::Sequence(items) => Ok(items.iter().any(|i| i.as_str() == Some(name.as_str()))),
                Node::Mapping(map) => Ok(map.contains_key(name)),
                _ => Err(PredicateError::mismatch("sequence or mapping", node)),
            },

            Check::HasKey { key } => node
                .as_mapping()
                .map(|m| m.contains_key(key))
                .ok_or_else(|| PredicateError::mismatch("mapping", node)),

            Check::NonEmpty => Ok(match node {
                Node::Sequence(items) => !items.is_empty(),
                Node::Mapping(map) => !map.is_empty(),
                Node::Scalar(Scalar::String(s)) => !s.is_empty(),
                Node::Scalar(Scalar::Null) => false,
                Node::Scalar(_) => true,
            }),

            Check::Kind { kind } => Ok(node.kind() == *kind),

            Check::Range { min, max } => {
                let n = node
                    .as_f64()
                    .ok_or_else(|| PredicateError::mismatch("number", node))?;
                Ok(min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi))
            }

            Check::MemoryAtMost { max_mb } => {
                let mb = match node {
                    Node::Scalar(Scalar::Int(bytes)) => *bytes as f64 / (1024.0 * 1024.0),
                    Node::Scalar(Scalar::String(s)) => {
                        parse_memory_mb(s).ok_or_else(|| PredicateError::InvalidValue {
                            value: s.clone(),
                            expected: "a memory size".to_string(),
                        })?
                    }
                    _ => return Err(PredicateError::mismatch("memory size", node)),
                };
                Ok(mb <= *max_mb)
            }

            Check::Refers { within, prefix } => {
                let refs = references(node)?;
                let Some(targets) = ctx.document.get(within).and_then(Node::as_mapping) else {
                    return Ok(false);
                };
                Ok(refs
                    .into_iter()
                    .filter_map(|r| match prefix {
                        Some(p) => r.strip_prefix(p.as_str()),
                        None => Some(r),
                    })
                    .all(|r| targets.contains_key(r)))
            }

            Check::At { path, then } => match node.get(path) {
                Some(child) => {
                    let child_path = ctx.path.join(path);
                    then.test(child, &ctx.nested(&child_path))
                }
                None => Ok(false),
            },

            Check::AnyItem { check } => {
                let items = node
                    .as_sequence()
                    .ok_or_else(|| PredicateError::mismatch("sequence", node))?;
                for (index, item) in items.iter().enumerate() {
                    let path = ctx.path.index(index);
                    if check.test(item, &ctx.nested(&path))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Check::Item {
                field,
                equals,
                at,
                then,
            } => {
                let items = node
                    .as_sequence()
                    .ok_or_else(|| PredicateError::mismatch("sequence", node))?;
                let found = items.iter().enumerate().find(|(_, item)| {
                    item.as_mapping()
                        .and_then(|m| m.get(field))
                        .and_then(Node::as_scalar)
                        .is_some_and(|s| s.loosely_equals(equals))
                });
                let Some((index, item)) = found else {
                    return Ok(false);
                };

                let mut path = ctx.path.index(index);
                let target = match at {
                    Some(rel) => {
                        path = path.join(rel);
                        match item.get(rel) {
                            Some(n) => n,
                            None => return Ok(false),
                        }
                    }
                    None => item,
                };
                match then {
                    Some(check) => check.test(target, &ctx.nested(&path)),
                    None => Ok(true),
                }
            }

            Check::Not { inner } => Ok(!inner.test(node, ctx)?),

            Check::AllOf { checks } => {
                for check in checks {
                    if !check.test(node, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Check::AnyOf { checks } => {
                for check in checks {
                    if check.test(node, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Check::Custom(predicate) => predicate.call(node, ctx),
        }
    }

    /// Phrase describing what the check expects, used in default messages
    pub fn expectation(&self) -> String {
        match self {
            Check::Exists => "exist".to_string(),
            Check::Equals { value } => format!("equal '{}'", value),
            Check::OneOf { values } => format!("be one of {}", join_scalars(values)),
            Check::Matches { pattern } => format!("match /{}/", pattern),
            Check::ContainsText { text } => format!("contain the text '{}'", text),
            Check::Contains { value } => format!("contain '{}'", value),
            Check::AnyItemContains { texts } => {
                format!("have an entry containing {}", quote_all(texts))
            }
            Check::Includes { name } => format!("include '{}'", name),
            Check::HasKey { key } => format!("have the key '{}'", key),
            Check::NonEmpty => "be non-empty".to_string(),
            Check::Kind { kind } => format!("be a {}", kind),
            Check::Range { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => format!("be between {} and {}", lo, hi),
                (Some(lo), None) => format!("be at least {}", lo),
                (None, Some(hi)) => format!("be at most {}", hi),
                (None, None) => "be a number".to_string(),
            },
            Check::MemoryAtMost { max_mb } => format!("be at most {}MB", max_mb),
            Check::Refers { within, prefix } => match prefix {
                Some(p) => format!("refer ({}...) to an entry of {}", p, within),
                None => format!("refer to an entry of {}", within),
            },
            Check::At { path, then } => format!("have {} that must {}", path, then.expectation()),
            Check::AnyItem { check } => format!("have an entry that must {}", check.expectation()),
            Check::Item {
                field,
                equals,
                at,
                then,
            } => {
                let mut text = format!("have an entry with {} = '{}'", field, equals);
                match (at, then) {
                    (Some(at), Some(check)) => {
                        text.push_str(&format!(" whose {} must {}", at, check.expectation()))
                    }
                    (Some(at), None) => text.push_str(&format!(" that has {}", at)),
                    (None, Some(check)) => {
                        text.push_str(&format!(" that must {}", check.expectation()))
                    }
                    (None, None) => {}
                }
                text
            }
            Check::Not { inner } => format!("not {}", inner.expectation()),
            Check::AllOf { checks } => join_expectations(checks, " and "),
            Check::AnyOf { checks } => {
                format!("either {}", join_expectations(checks, " or "))
            }
            Check::Custom(predicate) => format!("satisfy {}", predicate.name()),
        }
    }
}

impl<'a> MatchContext<'a> {
    pub fn new(document: &'a Document, path: &'a NodePath) -> Self {
        Self { document, path }
    }

    fn nested<'b>(&self, path: &'b NodePath) -> MatchContext<'b>
    where
        'a: 'b,
    {
        MatchContext {
            document: self.document,
            path,
        }
    }
}

/// Parse a Compose memory value into megabytes.
///
/// Accepts a bare byte count or a number followed by `b`, `k`, `m` or `g`
/// (optionally `b`/`ib` suffixed), case-insensitive.
pub fn parse_memory_mb(text: &str) -> Option<f64> {
    let lower = text.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);
    let value: f64 = number.parse().ok()?;

    let factor = match unit.trim() {
        "" | "b" => 1.0 / (1024.0 * 1024.0),
        "k" | "kb" | "kib" => 1.0 / 1024.0,
        "m" | "mb" | "mib" => 1.0,
        "g" | "gb" | "gib" => 1024.0,
        _ => return None,
    };
    Some(value * factor)
}

fn scalar_text(node: &Node) -> Result<String, PredicateError> {
    match node.as_scalar() {
        Some(Scalar::Null) | None => Err(PredicateError::mismatch("scalar", node)),
        Some(s) => Ok(s.to_string()),
    }
}

/// Text of a sequence element: a scalar, or the scalar values of a
/// long-syntax mapping joined with `:` (`bind:/host:/container`)
fn item_text(node: &Node) -> Option<String> {
    match node {
        Node::Scalar(Scalar::Null) => None,
        Node::Scalar(s) => Some(s.to_string()),
        Node::Mapping(map) => Some(
            map.iter()
                .filter_map(|(_, v)| v.as_scalar().map(|s| s.to_string()))
                .collect::<Vec<_>>()
                .join(":"),
        ),
        Node::Sequence(_) => None,
    }
}

/// Names a node refers to: a string, a list of strings, or mapping keys
fn references(node: &Node) -> Result<Vec<&str>, PredicateError> {
    match node {
        Node::Scalar(Scalar::String(s)) => Ok(vec![s.as_str()]),
        Node::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| PredicateError::mismatch("string reference", item))
            })
            .collect(),
        Node::Mapping(map) => Ok(map.keys().collect()),
        _ => Err(PredicateError::mismatch("reference", node)),
    }
}

fn join_scalars(values: &[Scalar]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_all(texts: &[String]) -> String {
    texts
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(" and ")
}

fn join_expectations(checks: &[Check], sep: &str) -> String {
    checks
        .iter()
        .map(Check::expectation)
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_str, Format};

    fn doc(text: &str) -> Document {
        parse_str(text, Format::Yaml).unwrap()
    }

    fn test_at(check: &Check, document: &Document, path: &str) -> Result<bool, PredicateError> {
        let path: NodePath = path.parse().unwrap();
        let node = document.get(&path).unwrap();
        check.test(node, &MatchContext::new(document, &path))
    }

    #[test]
    fn test_equals_and_one_of() {
        let d = doc("restart: unless-stopped\nversion: \"3.8\"\nauth_enabled: false\n");
        assert!(test_at(&Check::equals("unless-stopped"), &d, "restart").unwrap());
        assert!(!test_at(&Check::equals("always"), &d, "restart").unwrap());
        assert!(test_at(&Check::equals("3.8"), &d, "version").unwrap());
        assert!(test_at(&Check::equals(false), &d, "auth_enabled").unwrap());

        let policies = Check::one_of(["always", "unless-stopped", "on-failure"]);
        assert!(test_at(&policies, &d, "restart").unwrap());
    }

    #[test]
    fn test_contains_requires_sequence() {
        let d = doc("cap_add: [NET_ADMIN]\nimage: vpn\n");
        assert!(test_at(&Check::contains("NET_ADMIN"), &d, "cap_add").unwrap());
        assert!(!test_at(&Check::contains("SYS_ADMIN"), &d, "cap_add").unwrap());

        let err = test_at(&Check::contains("NET_ADMIN"), &d, "image").unwrap_err();
        assert_eq!(
            err,
            PredicateError::TypeMismatch {
                expected: "sequence".to_string(),
                found: NodeKind::String,
            }
        );
    }

    #[test]
    fn test_matches_reports_invalid_regex() {
        let d = doc("url: http://loki:3100/loki/api/v1/push\n");
        let ok = Check::Matches {
            pattern: "^http://loki:\\d+/".to_string(),
        };
        assert!(test_at(&ok, &d, "url").unwrap());

        let bad = Check::Matches {
            pattern: "([unclosed".to_string(),
        };
        assert!(matches!(
            test_at(&bad, &d, "url"),
            Err(PredicateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_any_item_contains_handles_long_syntax() {
        let d = doc(
            r#"
short:
  - ./config/prometheus:/etc/prometheus
long:
  - type: bind
    source: ./config/loki
    target: /etc/loki
"#,
        );
        let prom = Check::any_item_contains(&["prometheus", "/etc/prometheus"]);
        assert!(test_at(&prom, &d, "short").unwrap());
        let loki = Check::any_item_contains(&["loki", "/etc/loki"]);
        assert!(test_at(&loki, &d, "long").unwrap());
        assert!(!test_at(&loki, &d, "short").unwrap());
    }

    #[test]
    fn test_includes_sequence_or_mapping() {
        let d = doc(
            r#"
short: [prometheus, loki]
long:
  surfshark:
    condition: service_healthy
name: grafana
"#,
        );
        assert!(test_at(&Check::includes("loki"), &d, "short").unwrap());
        assert!(test_at(&Check::includes("surfshark"), &d, "long").unwrap());
        assert!(!test_at(&Check::includes("loki"), &d, "long").unwrap());
        assert!(test_at(&Check::includes("x"), &d, "name").is_err());
    }

    #[test]
    fn test_range_and_non_empty() {
        let d = doc("interval: 10\nempty: []\nblank: ''\nnothing: null\n");
        let range = Check::Range {
            min: Some(1.0),
            max: Some(60.0),
        };
        assert!(test_at(&range, &d, "interval").unwrap());
        assert!(test_at(&range, &d, "empty").is_err());

        assert!(!test_at(&Check::NonEmpty, &d, "empty").unwrap());
        assert!(!test_at(&Check::NonEmpty, &d, "blank").unwrap());
        assert!(!test_at(&Check::NonEmpty, &d, "nothing").unwrap());
        assert!(test_at(&Check::NonEmpty, &d, "interval").unwrap());
    }

    #[test]
    fn test_parse_memory_mb() {
        assert_eq!(parse_memory_mb("512m"), Some(512.0));
        assert_eq!(parse_memory_mb("1g"), Some(1024.0));
        assert_eq!(parse_memory_mb("1.5G"), Some(1536.0));
        assert_eq!(parse_memory_mb("256MB"), Some(256.0));
        assert_eq!(parse_memory_mb("2048k"), Some(2.0));
        assert_eq!(parse_memory_mb("1048576"), Some(1.0));
        assert_eq!(parse_memory_mb("lots"), None);
        assert_eq!(parse_memory_mb("12x"), None);
    }

    #[test]
    fn test_memory_at_most() {
        let d = doc("a: 512m\nb: 1g\nc: plenty\nd: 268435456\n");
        let check = Check::MemoryAtMost { max_mb: 512.0 };
        assert!(test_at(&check, &d, "a").unwrap());
        assert!(!test_at(&check, &d, "b").unwrap());
        assert!(matches!(
            test_at(&check, &d, "c"),
            Err(PredicateError::InvalidValue { .. })
        ));
        assert!(test_at(&check, &d, "d").unwrap());
    }

    #[test]
    fn test_refers_with_prefix() {
        let d = doc(
            r#"
services:
  surfshark: {}
  qbittorrent:
    network_mode: service:surfshark
    networks: [vpn]
  slskd:
    network_mode: service:gluetun
networks:
  vpn: {}
"#,
        );
        let service = Check::Refers {
            within: "services".parse().unwrap(),
            prefix: Some("service:".to_string()),
        };
        assert!(test_at(&service, &d, "services.qbittorrent.network_mode").unwrap());
        assert!(!test_at(&service, &d, "services.slskd.network_mode").unwrap());

        let network = Check::Refers {
            within: "networks".parse().unwrap(),
            prefix: None,
        };
        assert!(test_at(&network, &d, "services.qbittorrent.networks").unwrap());
    }

    #[test]
    fn test_item_with_nested_lookup() {
        let d = doc(
            r#"
scrape_configs:
  - job_name: node-exporter
    static_configs:
      - targets: ["node-exporter:9100"]
"#,
        );
        let check = Check::Item {
            field: "job_name".to_string(),
            equals: Scalar::from("node-exporter"),
            at: Some("static_configs[0].targets".parse().unwrap()),
            then: Some(Box::new(Check::contains("node-exporter:9100"))),
        };
        assert!(test_at(&check, &d, "scrape_configs").unwrap());

        let missing = Check::Item {
            field: "job_name".to_string(),
            equals: Scalar::from("kopia"),
            at: None,
            then: None,
        };
        assert!(!test_at(&missing, &d, "scrape_configs").unwrap());
    }

    #[test]
    fn test_any_item() {
        let d = doc(
            r#"
inhibit_rules:
  - source_match: {severity: critical}
    target_match: {severity: warning}
    equal: [alertname, instance]
"#,
        );
        let check = Check::AnyItem {
            check: Box::new(Check::AllOf {
                checks: vec![
                    Check::at("source_match.severity".parse().unwrap(), Check::equals("critical")),
                    Check::at("equal".parse().unwrap(), Check::contains("instance")),
                ],
            }),
        };
        assert!(test_at(&check, &d, "inhibit_rules").unwrap());

        let none = Check::AnyItem {
            check: Box::new(Check::at(
                "source_match.severity".parse().unwrap(),
                Check::equals("info"),
            )),
        };
        assert!(!test_at(&none, &d, "inhibit_rules").unwrap());
    }

    #[test]
    fn test_combinators() {
        let d = doc("privileged: true\n");
        let both = Check::AllOf {
            checks: vec![Check::Exists, Check::equals(true)],
        };
        assert!(test_at(&both, &d, "privileged").unwrap());
        assert!(!test_at(&Check::negate(both), &d, "privileged").unwrap());

        let either = Check::AnyOf {
            checks: vec![Check::equals(false), Check::equals(true)],
        };
        assert!(test_at(&either, &d, "privileged").unwrap());
    }

    #[test]
    fn test_custom_sees_context() {
        let d = doc("a:\n  b: 1\n");
        let check = Check::custom("path-is-a.b", |_, ctx| Ok(ctx.path.to_string() == "a.b"));
        assert!(test_at(&check, &d, "a.b").unwrap());
        assert_eq!(check.expectation(), "satisfy path-is-a.b");
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let check: Check = serde_yaml::from_str(
            r#"
type: at
path: depends_on.surfshark.condition
then:
  type: equals
  value: service_healthy
"#,
        )
        .unwrap();
        assert!(matches!(check, Check::At { .. }));

        let err = serde_yaml::from_str::<Check>("type: at\npath: 'a.*'\nthen: {type: exists}\n");
        assert!(err.is_err());
    }
}
