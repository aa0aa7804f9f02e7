//! Grafana provisioning rules

use super::{all_of, at, item, Parameters};
use crate::check::Check;
use crate::outcome::Severity;
use crate::rule::Rule;
use crate::rule_set::{RuleSet, RuleSetError};

const PROVISIONING_DOCS: &str =
    "https://grafana.com/docs/grafana/latest/administration/provisioning/";

pub(super) fn datasources(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let default = p.default_datasource.as_str();
    let mut rules = vec![
        Rule::new("grafana-datasources-api-version", "apiVersion", Check::equals(1_i64))?
            .with_severity(Severity::Error)
            .with_docs(PROVISIONING_DOCS)
            .required(),
        Rule::new("grafana-datasources-defined", "datasources", Check::NonEmpty)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "grafana-datasource-default",
            "datasources",
            item(
                "name",
                default,
                Some((
                    "$",
                    all_of(vec![
                        at("isDefault", Check::equals(true))?,
                        at("access", Check::equals("proxy"))?,
                    ]),
                )),
            )?,
        )?
        .with_message(&format!(
            "{{path}} must make '{}' the default datasource with proxy access",
            default
        ))
        .with_severity(Severity::Warning),
        Rule::new(
            "grafana-datasource-locked",
            "datasources[*]",
            at("editable", Check::equals(false))?,
        )?
        .with_message("{path} must not be editable from the UI")
        .with_severity(Severity::Info),
    ];

    for (name, url) in &p.datasources {
        rules.push(
            Rule::new(
                &format!("grafana-datasource-{}", name.to_ascii_lowercase()),
                "datasources",
                item("name", name, Some(("url", Check::equals(url.as_str()))))?,
            )?
            .with_message(&format!("{{path}} must define datasource '{}' at {}", name, url))
            .with_severity(Severity::Error),
        );
    }

    Ok(RuleSet::from_rules("grafana-datasources", rules)?
        .with_description("Grafana datasource provisioning"))
}

pub(super) fn dashboards(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let rules = vec![
        Rule::new("grafana-dashboards-api-version", "apiVersion", Check::equals(1_i64))?
            .with_severity(Severity::Error)
            .with_docs(PROVISIONING_DOCS)
            .required(),
        Rule::new("grafana-dashboards-providers", "providers", Check::NonEmpty)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "grafana-dashboards-provider-name",
            "providers",
            Check::AnyItem {
                check: Box::new(at("name", Check::contains_text(&p.dashboard_provider))?),
            },
        )?
        .with_severity(Severity::Warning),
        Rule::new(
            "grafana-dashboards-file-provider",
            "providers[*]",
            all_of(vec![
                at("type", Check::equals("file"))?,
                at("options.path", Check::contains_text("dashboards"))?,
            ]),
        )?
        .with_message("{path} must load dashboards from a file path")
        .with_severity(Severity::Error),
        Rule::new(
            "grafana-dashboards-ui-updates",
            "providers[*].allowUiUpdates",
            Check::equals(true),
        )?
        .with_severity(Severity::Info),
        Rule::new(
            "grafana-dashboards-update-interval",
            "providers[*]",
            at(
                "updateIntervalSeconds",
                Check::Range {
                    min: Some(1.0),
                    max: None,
                },
            )?,
        )?
        .with_message("{path} must poll for dashboard changes")
        .with_severity(Severity::Warning),
    ];

    Ok(RuleSet::from_rules("grafana-dashboards", rules)?
        .with_description("Grafana dashboard providers"))
}
