//! Prometheus, alert rule, Alertmanager, Loki and Promtail rules

use super::{all_of, at, item, Parameters};
use crate::check::Check;
use crate::document::PathError;
use crate::outcome::Severity;
use crate::rule::Rule;
use crate::rule_set::{RuleSet, RuleSetError};

pub(super) fn prometheus(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let mut rules = vec![
        Rule::new(
            "prometheus-scrape-interval",
            "global.scrape_interval",
            Check::equals(p.scrape_interval.as_str()),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "prometheus-evaluation-interval",
            "global.evaluation_interval",
            Check::Exists,
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "prometheus-cluster-label",
            "global.external_labels.cluster",
            Check::equals(p.cluster.as_str()),
        )?
        .with_description("Series carry the cluster label used by dashboards")
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "prometheus-alertmanager",
            "alerting.alertmanagers",
            all_of(vec![
                Check::NonEmpty,
                at(
                    "[0].static_configs[0].targets",
                    Check::contains(p.alertmanager_target.as_str()),
                )?,
            ]),
        )?
        .with_description("Alerts are delivered to Alertmanager")
        .with_severity(Severity::Error)
        .with_tag("alerting")
        .required(),
        Rule::new(
            "prometheus-rule-files",
            "rule_files",
            Check::contains(p.alert_rule_file.as_str()),
        )?
        .with_severity(Severity::Error)
        .with_tag("alerting")
        .required(),
        Rule::new("prometheus-scrape-configs", "scrape_configs", Check::NonEmpty)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "prometheus-job-name",
            "scrape_configs[*]",
            at("job_name", Check::NonEmpty)?,
        )?
        .with_message("{path} must set job_name")
        .with_severity(Severity::Error),
    ];

    for (job, target) in &p.scrape_targets {
        rules.push(
            Rule::new(
                &format!("prometheus-job-{}", job),
                "scrape_configs",
                item(
                    "job_name",
                    job,
                    Some(("static_configs[0].targets", Check::contains(target.as_str()))),
                )?,
            )?
            .with_message(&format!("{{path}} must scrape job '{}' at {}", job, target))
            .with_severity(Severity::Error)
            .with_tag("scrape"),
        );
    }

    for job in &p.docker_sd_jobs {
        rules.push(
            Rule::new(
                &format!("prometheus-job-{}", job),
                "scrape_configs",
                item("job_name", job, Some(("docker_sd_configs", Check::NonEmpty)))?,
            )?
            .with_message(&format!(
                "{{path}} must discover job '{}' through docker_sd_configs",
                job
            ))
            .with_severity(Severity::Warning)
            .with_tag("scrape"),
        );
    }

    Ok(RuleSet::from_rules("prometheus", rules)?
        .with_description("Prometheus server configuration"))
}

pub(super) fn prometheus_alerts(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let mut rules = vec![
        Rule::new("alerts-groups-defined", "groups", Check::NonEmpty)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "alerts-annotations",
            "groups.*.rules.*",
            all_of(vec![
                at("annotations.summary", Check::NonEmpty)?,
                at("annotations.description", Check::NonEmpty)?,
            ]),
        )?
        .with_message("{path} must carry a summary and a description annotation")
        .with_severity(Severity::Warning),
        Rule::new(
            "alerts-severity-label",
            "groups.*.rules.*",
            at(
                "labels.severity",
                Check::one_of(p.alert_severities.iter().map(String::as_str)),
            )?,
        )?
        .with_message("{path} must label its severity as one of the routed levels")
        .with_severity(Severity::Error),
        Rule::new("alerts-expr", "groups.*.rules.*.expr", Check::NonEmpty)?
            .with_severity(Severity::Error),
    ];

    for group in &p.alert_groups {
        rules.push(
            Rule::new(
                &format!("alerts-group-{}", kebab(group)),
                "groups",
                item("name", group, None)?,
            )?
            .with_message(&format!("{{path}} must define the group '{}'", group))
            .with_severity(Severity::Error),
        );
    }

    for spec in &p.alerts {
        let mut checks = Vec::new();
        if let Some(severity) = &spec.severity {
            checks.push(at("labels.severity", Check::equals(severity.as_str()))?);
        }
        if let Some(threshold) = &spec.threshold {
            checks.push(at("expr", Check::contains_text(threshold))?);
        }
        let entry = Check::Item {
            field: "alert".to_string(),
            equals: spec.alert.as_str().into(),
            at: None,
            then: if checks.is_empty() {
                None
            } else {
                Some(Box::new(all_of(checks)))
            },
        };

        rules.push(
            Rule::new(
                &format!("alerts-{}", kebab(&spec.alert)),
                "groups",
                item("name", &spec.group, Some(("rules", entry)))?,
            )?
            .with_message(&format!(
                "{{path}} must define alert '{}' in group '{}'",
                spec.alert, spec.group
            ))
            .with_severity(Severity::Error)
            .with_tag("alert"),
        );
    }

    Ok(RuleSet::from_rules("prometheus-alerts", rules)?
        .with_description("Prometheus alerting rules"))
}

pub(super) fn alertmanager(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let mut rules = vec![
        Rule::new(
            "alertmanager-global",
            "global",
            all_of(vec![
                at("resolve_timeout", Check::Exists)?,
                at("smtp_smarthost", Check::Exists)?,
                at("smtp_from", Check::Exists)?,
            ]),
        )?
        .with_message("{path} must set resolve_timeout, smtp_smarthost and smtp_from")
        .with_severity(Severity::Error)
        .required(),
        Rule::new(
            "alertmanager-smtp-tls",
            "global.smtp_require_tls",
            Check::equals(true),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new("alertmanager-route-receiver", "route.receiver", Check::Exists)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "alertmanager-group-by",
            "route.group_by",
            all_of(p.group_by.iter().map(|l| Check::contains(l.as_str())).collect()),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "alertmanager-route-timing",
            "route",
            all_of(vec![
                at("group_wait", Check::Exists)?,
                at("repeat_interval", Check::Exists)?,
            ]),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new("alertmanager-receivers", "receivers", Check::NonEmpty)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "alertmanager-critical-email",
            "receivers",
            item(
                "name",
                "critical",
                Some((
                    "email_configs",
                    all_of(vec![
                        Check::NonEmpty,
                        at("[0].headers.Subject", Check::contains_text("CRITICAL"))?,
                    ]),
                )),
            )?,
        )?
        .with_message("{path} must mail critical alerts with CRITICAL in the subject")
        .with_severity(Severity::Warning),
        Rule::new(
            "alertmanager-inhibit-warnings",
            "inhibit_rules",
            Check::AnyItem {
                check: Box::new(all_of(vec![
                    at("source_match.severity", Check::equals("critical"))?,
                    at("target_match.severity", Check::equals("warning"))?,
                    at(
                        "equal",
                        all_of(
                            p.inhibit_equal
                                .iter()
                                .map(|l| Check::contains(l.as_str()))
                                .collect(),
                        ),
                    )?,
                ])),
            },
        )?
        .with_description("A firing critical alert silences the matching warning")
        .with_severity(Severity::Warning)
        .required(),
    ];

    for receiver in &p.receivers {
        rules.push(
            Rule::new(
                &format!("alertmanager-receiver-{}", receiver),
                "receivers",
                item("name", receiver, None)?,
            )?
            .with_message(&format!("{{path}} must define receiver '{}'", receiver))
            .with_severity(Severity::Error),
        );
    }

    for level in ["critical", "warning"] {
        rules.push(
            Rule::new(
                &format!("alertmanager-route-{}", level),
                "route.routes",
                item("receiver", level, Some(("match.severity", Check::equals(level))))?,
            )?
            .with_message(&format!(
                "{{path}} must send {} alerts to the '{}' receiver",
                level, level
            ))
            .with_severity(Severity::Error)
            .required(),
        );
    }

    Ok(RuleSet::from_rules("alertmanager", rules)?
        .with_description("Alertmanager routing and receivers"))
}

pub(super) fn loki(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let rules = vec![
        Rule::new(
            "loki-http-port",
            "server.http_listen_port",
            Check::equals(p.loki_port),
        )?
        .with_severity(Severity::Error)
        .required(),
        Rule::new("loki-grpc-port", "server.grpc_listen_port", Check::Exists)?
            .with_severity(Severity::Warning)
            .required(),
        Rule::new("loki-auth-disabled", "auth_enabled", Check::equals(false))?
            .with_description("Single-tenant mode; promtail pushes without an org id")
            .with_severity(Severity::Error)
            .required(),
        Rule::new(
            "loki-filesystem-storage",
            "common.storage.filesystem",
            all_of(vec![
                at("chunks_directory", Check::Exists)?,
                at("rules_directory", Check::Exists)?,
            ]),
        )?
        .with_severity(Severity::Error)
        .required(),
        Rule::new(
            "loki-replication-factor",
            "common.replication_factor",
            Check::equals(1_i64),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "loki-schema",
            "schema_config.configs",
            all_of(vec![
                Check::NonEmpty,
                at("[0].store", Check::equals("boltdb-shipper"))?,
                at("[0].object_store", Check::equals("filesystem"))?,
            ]),
        )?
        .with_severity(Severity::Error)
        .required(),
        Rule::new(
            "loki-retention-period",
            "limits_config.retention_period",
            Check::equals(p.log_retention.as_str()),
        )?
        .with_severity(Severity::Warning)
        .with_tag("retention")
        .required(),
        Rule::new(
            "loki-query-limits",
            "limits_config",
            all_of(vec![
                at("max_query_length", Check::Exists)?,
                at("max_entries_limit_per_query", Check::Exists)?,
            ]),
        )?
        .with_severity(Severity::Warning)
        .required(),
        Rule::new(
            "loki-compactor-retention",
            "compactor.retention_enabled",
            Check::equals(true),
        )?
        .with_description("Retention is only enforced by the compactor")
        .with_severity(Severity::Warning)
        .with_tag("retention")
        .required(),
    ];

    Ok(RuleSet::from_rules("loki", rules)?.with_description("Loki log store"))
}

pub(super) fn promtail(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let mut rules = vec![
        Rule::new("promtail-http-port", "server.http_listen_port", Check::Exists)?
            .with_severity(Severity::Warning)
            .required(),
        Rule::new(
            "promtail-client",
            "clients",
            all_of(vec![
                Check::NonEmpty,
                at("[0].url", Check::equals(p.loki_push_url.as_str()))?,
            ]),
        )?
        .with_description("Logs are pushed to the stack's Loki")
        .with_severity(Severity::Error)
        .required(),
        log_path_rule("promtail-system-logs", "system", "/var/log")?,
        log_path_rule("promtail-kopia-logs", "kopia", "kopia")?,
        Rule::new(
            "promtail-docker-discovery",
            "scrape_configs",
            item(
                "job_name",
                "docker",
                Some((
                    "docker_sd_configs[0].host",
                    Check::equals(p.docker_socket.as_str()),
                )),
            )?,
        )?
        .with_severity(Severity::Error),
        Rule::new(
            "promtail-static-labels",
            "scrape_configs[*].static_configs[*].labels",
            all_of(vec![
                at("host", Check::equals(p.host.as_str()))?,
                at("job", Check::Exists)?,
            ]),
        )?
        .with_message(&format!("{{path}} must set host: {} and a job label", p.host))
        .with_severity(Severity::Warning),
    ];

    for job in &p.log_jobs {
        rules.push(
            Rule::new(
                &format!("promtail-job-{}", job),
                "scrape_configs",
                item("job_name", job, None)?,
            )?
            .with_message(&format!("{{path}} must define scrape job '{}'", job))
            .with_severity(Severity::Error),
        );
    }

    Ok(RuleSet::from_rules("promtail", rules)?.with_description("Promtail log shipping"))
}

/// Static job whose first `__path__` glob contains `text`
fn log_path_rule(id: &str, job: &str, text: &str) -> Result<Rule, PathError> {
    Ok(Rule::new(
        id,
        "scrape_configs",
        item(
            "job_name",
            job,
            Some((
                "static_configs[0].labels.__path__",
                Check::contains_text(text),
            )),
        )?,
    )?
    .with_severity(Severity::Warning))
}

/// `HighCPUUsage` -> `high-cpu-usage`, `system_alerts` -> `system-alerts`
fn kebab(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' {
            out.push('-');
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                out.push('-');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
