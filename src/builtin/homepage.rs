//! Homepage dashboard rules

use super::{all_of, at};
use crate::check::Check;
use crate::document::NodeKind;
use crate::outcome::Severity;
use crate::rule::Rule;
use crate::rule_set::{RuleSet, RuleSetError};

fn kind(kind: NodeKind) -> Check {
    Check::Kind { kind }
}

/// Root is a non-empty sequence
fn non_empty_list(id: &str) -> Result<Rule, RuleSetError> {
    Ok(
        Rule::new(id, "$", all_of(vec![kind(NodeKind::Sequence), Check::NonEmpty]))?
            .with_message("{path} must be a non-empty list")
            .with_severity(Severity::Error),
    )
}

/// Root holds some configuration
fn defined(id: &str) -> Result<Rule, RuleSetError> {
    Ok(
        Rule::new(id, "$", Check::negate(kind(NodeKind::Null)))?
            .with_message("{path} must not be empty")
            .with_severity(Severity::Error),
    )
}

pub(super) fn services() -> Result<RuleSet, RuleSetError> {
    let rules = vec![
        non_empty_list("homepage-services-groups")?,
        Rule::new("homepage-services-group-shape", "[*]", kind(NodeKind::Mapping))?
            .with_message("{path} must map a group name to its services")
            .with_severity(Severity::Error),
        Rule::new("homepage-services-entries", "[*].*", kind(NodeKind::Sequence))?
            .with_message("{path} must list the services of the group")
            .with_severity(Severity::Warning),
        Rule::new(
            "homepage-service-href",
            "[*].*[*].*",
            at("href", Check::NonEmpty)?,
        )?
        .with_message("{path} must link to the service")
        .with_severity(Severity::Info),
    ];
    Ok(RuleSet::from_rules("homepage-services", rules)?
        .with_description("Homepage service groups"))
}

pub(super) fn bookmarks() -> Result<RuleSet, RuleSetError> {
    let rules = vec![Rule::new("homepage-bookmarks-list", "$", kind(NodeKind::Sequence))?
        .with_message("{path} must be a list of bookmark groups")
        .with_severity(Severity::Error)];
    RuleSet::from_rules("homepage-bookmarks", rules)
}

pub(super) fn widgets() -> Result<RuleSet, RuleSetError> {
    let rules = vec![
        non_empty_list("homepage-widgets-list")?,
        Rule::new(
            "homepage-widgets-resources",
            "$",
            Check::AnyItem {
                check: Box::new(all_of(vec![
                    kind(NodeKind::Mapping),
                    Check::has_key("resources"),
                ])),
            },
        )?
        .with_message("{path} must include a resources widget")
        .with_severity(Severity::Warning),
    ];
    RuleSet::from_rules("homepage-widgets", rules)
}

pub(super) fn settings() -> Result<RuleSet, RuleSetError> {
    RuleSet::from_rules("homepage-settings", vec![defined("homepage-settings-defined")?])
}

pub(super) fn docker() -> Result<RuleSet, RuleSetError> {
    RuleSet::from_rules("homepage-docker", vec![defined("homepage-docker-defined")?])
}
