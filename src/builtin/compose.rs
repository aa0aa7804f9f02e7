//! Docker Compose manifest rules

use super::{all_of, at, key_path, pattern, Parameters};
use crate::check::Check;
use crate::document::{NodeKind, PathError, Scalar};
use crate::outcome::Severity;
use crate::rule::Rule;
use crate::rule_set::{RuleSet, RuleSetError};

/// Mounts each service needs: (service, rule suffix, texts one volume entry must contain)
const MOUNTS: [(&str, &str, &[&str]); 17] = [
    ("qbittorrent", "downloads", &["/downloads"]),
    ("prometheus", "config", &["prometheus", "/etc/prometheus"]),
    ("prometheus", "data", &["prometheus_data"]),
    ("grafana", "provisioning", &["provisioning"]),
    ("loki", "config", &["loki", "/etc/loki"]),
    ("promtail", "system-logs", &["/var/log"]),
    ("promtail", "container-logs", &["docker/containers"]),
    ("node-exporter", "proc", &["/proc"]),
    ("node-exporter", "sys", &["/sys"]),
    ("cadvisor", "docker-socket", &["docker.sock"]),
    ("kopia", "repository", &["repository"]),
    ("nextcloud", "torrents", &["torrents"]),
    ("nextcloud", "soulseek", &["soulseek"]),
    ("portainer", "docker-socket", &["docker.sock"]),
    ("dozzle", "docker-socket", &["docker.sock", ":ro"]),
    ("homepage", "config", &["homepage", "/app/config"]),
    ("homepage", "docker-socket", &["docker.sock"]),
];

/// Published ports: (service, text one `ports` entry must contain)
const PORTS: [(&str, &str); 8] = [
    ("prometheus", "9090"),
    ("grafana", "3000"),
    ("loki", "3100"),
    ("node-exporter", "9100"),
    ("smartctl-exporter", "9633"),
    ("nginx-proxy-manager", "80:80"),
    ("nginx-proxy-manager", "443:443"),
    ("nginx-proxy-manager", "81:81"),
];

/// Service dependencies: (service, services it depends on)
const DEPENDENCIES: [(&str, &[&str]); 4] = [
    ("prometheus", &["node-exporter", "cadvisor", "smartctl-exporter"]),
    ("grafana", &["prometheus", "loki"]),
    ("promtail", &["loki"]),
    ("nextcloud", &["nextcloud-db"]),
];

const PRIVILEGED: [&str; 2] = ["cadvisor", "smartctl-exporter"];

pub(super) fn rule_set(p: &Parameters) -> Result<RuleSet, RuleSetError> {
    let mut rules = structure(p)?;
    rules.extend(networks(p)?);
    rules.extend(references()?);
    rules.extend(vpn(p)?);
    rules.extend(services(p)?);
    rules.extend(resources(p)?);
    rules.extend(restart(p)?);

    Ok(RuleSet::from_rules("compose", rules)?
        .with_description("Docker Compose manifest of the stack"))
}

fn structure(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    Ok(vec![
        Rule::new("compose-version", "version", Check::equals(p.compose_version.as_str()))?
            .with_description("Compose file format version")
            .with_severity(Severity::Warning)
            .required(),
        Rule::new(
            "compose-services-defined",
            "services",
            all_of(vec![
                Check::Kind {
                    kind: NodeKind::Mapping,
                },
                Check::NonEmpty,
            ]),
        )?
        .with_description("At least one service is declared")
        .with_severity(Severity::Error)
        .required(),
        Rule::new("compose-networks-defined", "networks", Check::Exists)?
            .with_severity(Severity::Error)
            .required(),
        Rule::new("compose-volumes-defined", "volumes", Check::Exists)?
            .with_severity(Severity::Warning)
            .required(),
    ])
}

fn networks(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    p.networks
        .iter()
        .map(|network| {
            let network = network.as_str();
            let name = format!("{}{}", p.network_name_prefix, network);
            Ok(Rule::new(
                &format!("compose-network-{}", network),
                &pattern(&["networks", network]),
                all_of(vec![
                    at("driver", Check::equals(p.network_driver.as_str()))?,
                    at("name", Check::equals(name.as_str()))?,
                ]),
            )?
            .with_description("Network is declared with the stack driver and name")
            .with_severity(Severity::Error)
            .with_tag("network")
            .required())
        })
        .collect()
}

/// Names used by one service must exist elsewhere in the manifest
fn references() -> Result<Vec<Rule>, PathError> {
    Ok(vec![
        Rule::new(
            "compose-network-references",
            "services.*.networks",
            Check::Refers {
                within: key_path(&["networks"]),
                prefix: None,
            },
        )?
        .with_message("{path} names a network that is not declared")
        .with_severity(Severity::Error)
        .with_tag("network"),
        Rule::new(
            "compose-network-mode-references",
            "services.*.network_mode",
            Check::Refers {
                within: key_path(&["services"]),
                prefix: Some("service:".to_string()),
            },
        )?
        .with_message("{path} routes through a service that is not declared")
        .with_severity(Severity::Error)
        .with_tag("network"),
        Rule::new(
            "compose-depends-on-references",
            "services.*.depends_on",
            Check::Refers {
                within: key_path(&["services"]),
                prefix: None,
            },
        )?
        .with_message("{path} depends on a service that is not declared")
        .with_severity(Severity::Error),
    ])
}

fn vpn(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    let vpn = p.vpn_service.as_str();
    let mut rules = vec![
        Rule::new(
            "compose-vpn-net-admin",
            &pattern(&["services", vpn, "cap_add"]),
            Check::contains("NET_ADMIN"),
        )?
        .with_severity(Severity::Error)
        .with_tag("vpn")
        .required(),
        Rule::new(
            "compose-vpn-tun-device",
            &pattern(&["services", vpn, "devices"]),
            Check::contains("/dev/net/tun"),
        )?
        .with_severity(Severity::Error)
        .with_tag("vpn")
        .required(),
        Rule::new(
            "compose-vpn-healthcheck",
            &pattern(&["services", vpn, "healthcheck", "test"]),
            Check::Exists,
        )?
        .with_description("Clients wait for the tunnel to report healthy")
        .with_severity(Severity::Error)
        .with_tag("vpn")
        .required(),
        Rule::new(
            "compose-vpn-networks",
            &pattern(&["services", vpn, "networks"]),
            all_of(p.vpn_networks.iter().map(|n| Check::includes(n)).collect()),
        )?
        .with_severity(Severity::Error)
        .with_tag("vpn")
        .required(),
    ];

    for client in p.vpn_clients.iter().map(String::as_str) {
        rules.push(
            Rule::new(
                &format!("compose-vpn-client-{}-route", client),
                &pattern(&["services", client, "network_mode"]),
                Check::equals(format!("service:{}", vpn)),
            )?
            .with_description("Client traffic leaves through the VPN container")
            .with_severity(Severity::Error)
            .with_tag("vpn")
            .required(),
        );
        rules.push(
            Rule::new(
                &format!("compose-vpn-client-{}-healthy", client),
                &pattern(&["services", client, "depends_on", vpn, "condition"]),
                Check::equals("service_healthy"),
            )?
            .with_severity(Severity::Error)
            .with_tag("vpn")
            .required(),
        );
    }

    Ok(rules)
}

fn services(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    let mut rules = Vec::new();

    for service in p.required_services.iter().map(String::as_str) {
        rules.push(
            Rule::new(
                &format!("compose-service-{}", service),
                &pattern(&["services", service]),
                Check::Exists,
            )?
            .with_severity(Severity::Error)
            .required(),
        );
    }

    // Per-service details only apply when the service is present
    for (service, suffix, texts) in MOUNTS {
        rules.push(
            Rule::new(
                &format!("compose-{}-mount-{}", service, suffix),
                &pattern(&["services", service]),
                at("volumes", Check::any_item_contains(texts))?,
            )?
            .with_severity(Severity::Error)
            .with_tag("volumes"),
        );
    }

    for (service, port) in PORTS {
        rules.push(
            Rule::new(
                &format!("compose-{}-port-{}", service, port.replace(':', "-")),
                &pattern(&["services", service]),
                at("ports", Check::any_item_contains(&[port]))?,
            )?
            .with_severity(Severity::Warning)
            .with_tag("ports"),
        );
    }

    for (service, deps) in DEPENDENCIES {
        rules.push(
            Rule::new(
                &format!("compose-{}-depends-on", service),
                &pattern(&["services", service]),
                at(
                    "depends_on",
                    all_of(deps.iter().map(|d| Check::includes(d)).collect()),
                )?,
            )?
            .with_description("Service starts after the services it reads from")
            .with_severity(Severity::Warning),
        );
    }

    for service in PRIVILEGED {
        rules.push(
            Rule::new(
                &format!("compose-{}-privileged", service),
                &pattern(&["services", service]),
                at("privileged", Check::equals(true))?,
            )?
            .with_description("Exporter needs host device access")
            .with_severity(Severity::Error),
        );
    }

    rules.push(
        Rule::new(
            "compose-kopia-metrics",
            "services.kopia.environment",
            env_var("KOPIA_PROMETHEUS_ENABLED", None),
        )?
        .with_severity(Severity::Warning)
        .with_tag("backup"),
    );
    rules.push(
        Rule::new("compose-kopia-healthcheck", "services.kopia", at("healthcheck", Check::Exists)?)?
            .with_severity(Severity::Warning)
            .with_tag("backup"),
    );
    rules.push(
        Rule::new(
            "compose-kopia-fuse",
            "services.kopia",
            all_of(vec![
                at("cap_add", Check::contains("SYS_ADMIN"))?,
                at("devices", Check::any_item_contains(&["fuse"]))?,
            ]),
        )?
        .with_description("Snapshots are mounted through FUSE")
        .with_severity(Severity::Error)
        .with_tag("backup"),
    );
    rules.push(
        Rule::new(
            "compose-watchtower-cleanup",
            "services.watchtower",
            at("environment", env_var("WATCHTOWER_CLEANUP", Some("true")))?,
        )?
        .with_severity(Severity::Warning),
    );

    Ok(rules)
}

/// Environment variable set, in either list (`KEY=value`) or mapping form
fn env_var(name: &str, value: Option<&str>) -> Check {
    let (list_entry, mapping_check) = match value {
        Some(v) => (
            format!("{}={}", name, v),
            Check::at(
                key_path(&[name]),
                Check::OneOf {
                    values: vec![Scalar::from(v), parse_scalar(v)],
                },
            ),
        ),
        None => (name.to_string(), Check::has_key(name)),
    };

    Check::AnyOf {
        checks: vec![
            all_of(vec![
                Check::Kind {
                    kind: NodeKind::Sequence,
                },
                Check::AnyItemContains {
                    texts: vec![list_entry],
                },
            ]),
            all_of(vec![
                Check::Kind {
                    kind: NodeKind::Mapping,
                },
                mapping_check,
            ]),
        ],
    }
}

/// YAML reading of an environment value (`true`, `1`) for mapping-form lookups
fn parse_scalar(text: &str) -> Scalar {
    if let Ok(b) = text.parse::<bool>() {
        Scalar::Bool(b)
    } else if let Ok(i) = text.parse::<i64>() {
        Scalar::Int(i)
    } else {
        Scalar::from(text)
    }
}

fn resources(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    let mut rules = Vec::new();
    for (service, limit) in &p.memory_limits_mb {
        let service = service.as_str();
        let max_mb = limit * p.memory_tolerance;
        rules.push(
            Rule::new(
                &format!("compose-{}-memory-limit", service),
                &pattern(&["services", service]),
                at("mem_limit", Check::MemoryAtMost { max_mb })?,
            )?
            .with_message(&format!(
                "{{path}} must set mem_limit at or below {}MB",
                max_mb
            ))
            .with_severity(Severity::Warning)
            .with_tag("resources"),
        );
        rules.push(
            Rule::new(
                &format!("compose-{}-cpu-limit", service),
                &pattern(&["services", service]),
                at("cpus", Check::Exists)?,
            )?
            .with_severity(Severity::Warning)
            .with_tag("resources"),
        );
    }
    Ok(rules)
}

fn restart(p: &Parameters) -> Result<Vec<Rule>, PathError> {
    let mut rules = vec![Rule::new(
        "compose-restart-policy",
        "services.*",
        at(
            "restart",
            Check::one_of(p.restart_policies.iter().map(String::as_str)),
        )?,
    )?
    .with_message("{path} must set restart to one of the supported policies")
    .with_severity(Severity::Error)
    .with_tag("restart")];

    for service in p.critical_services.iter().map(String::as_str) {
        rules.push(
            Rule::new(
                &format!("compose-{}-restart-critical", service),
                &pattern(&["services", service]),
                at("restart", Check::equals(p.critical_restart_policy.as_str()))?,
            )?
            .with_description("Critical services come back after a manual stop only")
            .with_severity(Severity::Error)
            .with_tag("restart"),
        );
    }

    Ok(rules)
}
