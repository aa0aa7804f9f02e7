//! Built-in rule sets for a self-hosted monitoring and media stack
//!
//! Covers a Docker Compose manifest, Prometheus and its alert rules,
//! Alertmanager, Loki, Promtail, Grafana provisioning and the Homepage
//! dashboard. Expected names and thresholds come from [`Parameters`], so a
//! project can adapt them from the `parameters` section of its configuration.

mod compose;
mod grafana;
mod homepage;
mod monitoring;

use crate::check::Check;
use crate::document::{NodePath, PathError, Segment};
use crate::rule_set::{RuleSet, RuleSetError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Names of the built-in rule sets
pub const NAMES: [&str; 13] = [
    "compose",
    "prometheus",
    "prometheus-alerts",
    "alertmanager",
    "loki",
    "promtail",
    "grafana-datasources",
    "grafana-dashboards",
    "homepage-services",
    "homepage-bookmarks",
    "homepage-widgets",
    "homepage-settings",
    "homepage-docker",
];

/// Default file detection, first match wins
pub const DETECTION: [(&str, &str); 14] = [
    ("**/docker-compose*.{yml,yaml}", "compose"),
    ("**/compose.{yml,yaml}", "compose"),
    ("**/prometheus.{yml,yaml}", "prometheus"),
    ("**/alerts.{yml,yaml}", "prometheus-alerts"),
    ("**/alertmanager.{yml,yaml}", "alertmanager"),
    ("**/loki*.{yml,yaml}", "loki"),
    ("**/promtail*.{yml,yaml}", "promtail"),
    ("**/datasources/*.{yml,yaml}", "grafana-datasources"),
    ("**/dashboards/*.{yml,yaml}", "grafana-dashboards"),
    ("**/homepage/services.{yml,yaml}", "homepage-services"),
    ("**/homepage/bookmarks.{yml,yaml}", "homepage-bookmarks"),
    ("**/homepage/widgets.{yml,yaml}", "homepage-widgets"),
    ("**/homepage/settings.{yml,yaml}", "homepage-settings"),
    ("**/homepage/docker.{yml,yaml}", "homepage-docker"),
];

/// One expected Prometheus alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSpec {
    /// Group the alert belongs to
    pub group: String,
    /// Alert name
    pub alert: String,
    /// Expected `labels.severity`
    #[serde(default)]
    pub severity: Option<String>,
    /// Text the `expr` must contain, usually the threshold
    #[serde(default)]
    pub threshold: Option<String>,
}

impl AlertSpec {
    fn new(group: &str, alert: &str, severity: Option<&str>, threshold: Option<String>) -> Self {
        Self {
            group: group.to_string(),
            alert: alert.to_string(),
            severity: severity.map(str::to_string),
            threshold,
        }
    }
}

/// Expected names and thresholds used to build the rule sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Compose file `version`
    pub compose_version: String,
    /// Networks every stack defines
    pub networks: Vec<String>,
    pub network_driver: String,
    /// Network `name` is this prefix followed by the network key
    pub network_name_prefix: String,
    /// Services that must be defined
    pub required_services: Vec<String>,
    /// Accepted restart policies for every service
    pub restart_policies: Vec<String>,
    /// Services that must use `critical_restart_policy`
    pub critical_services: Vec<String>,
    pub critical_restart_policy: String,
    /// Service providing the VPN tunnel
    pub vpn_service: String,
    /// Networks the VPN service joins
    pub vpn_networks: Vec<String>,
    /// Services routed through the VPN
    pub vpn_clients: Vec<String>,
    /// Memory budget per service, in megabytes
    pub memory_limits_mb: BTreeMap<String, f64>,
    /// Factor applied to every memory budget; a limit up to twice the
    /// listed budget is accepted by default
    pub memory_tolerance: f64,

    /// `external_labels.cluster` in Prometheus
    pub cluster: String,
    pub scrape_interval: String,
    pub alertmanager_target: String,
    pub alert_rule_file: String,
    /// Scrape job name -> expected static target
    pub scrape_targets: BTreeMap<String, String>,
    /// Jobs discovered through `docker_sd_configs`
    pub docker_sd_jobs: Vec<String>,
    pub alert_groups: Vec<String>,
    pub alerts: Vec<AlertSpec>,
    /// Accepted values of an alert's `labels.severity`
    pub alert_severities: Vec<String>,

    /// Alertmanager receivers
    pub receivers: Vec<String>,
    /// Labels alerts are grouped by
    pub group_by: Vec<String>,
    /// Labels an inhibition rule must compare
    pub inhibit_equal: Vec<String>,

    pub loki_port: i64,
    pub log_retention: String,
    pub loki_push_url: String,
    /// Promtail scrape jobs
    pub log_jobs: Vec<String>,
    /// `labels.host` on static Promtail jobs
    pub host: String,
    pub docker_socket: String,

    /// Grafana datasource name -> URL
    pub datasources: BTreeMap<String, String>,
    pub default_datasource: String,
    /// Text the dashboard provider name must contain
    pub dashboard_provider: String,
}

impl Default for Parameters {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };

        let memory_limits_mb = [
            ("surfshark", 256.0),
            ("qbittorrent", 512.0),
            ("slskd", 384.0),
            ("kopia", 768.0),
            ("prometheus", 512.0),
            ("grafana", 384.0),
            ("loki", 256.0),
            ("promtail", 128.0),
            ("alertmanager", 128.0),
            ("nextcloud", 512.0),
            ("portainer", 128.0),
            ("watchtower", 64.0),
            ("node-exporter", 64.0),
            ("cadvisor", 128.0),
            ("smartctl-exporter", 64.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let memory_alert_percent = 85;
        let disk_free_percent = 10;
        let disk_temperature_celsius = 45;
        let snapshot_max_age_seconds = 86_400;
        let container_memory_percent = 90;

        Self {
            compose_version: "3.8".to_string(),
            networks: strings(&["vpn", "monitoring", "proxy", "default"]),
            network_driver: "bridge".to_string(),
            network_name_prefix: "potatostack_".to_string(),
            required_services: strings(&[
                "surfshark",
                "qbittorrent",
                "slskd",
                "prometheus",
                "grafana",
                "loki",
                "promtail",
                "alertmanager",
                "node-exporter",
                "cadvisor",
                "smartctl-exporter",
                "kopia",
                "nextcloud",
                "nextcloud-db",
                "portainer",
                "watchtower",
                "uptime-kuma",
                "dozzle",
                "nginx-proxy-manager",
                "homepage",
            ]),
            restart_policies: strings(&["always", "unless-stopped", "on-failure"]),
            critical_services: strings(&["surfshark", "prometheus", "grafana", "kopia", "nextcloud"]),
            critical_restart_policy: "unless-stopped".to_string(),
            vpn_service: "surfshark".to_string(),
            vpn_networks: strings(&["vpn", "monitoring"]),
            vpn_clients: strings(&["qbittorrent", "slskd"]),
            memory_limits_mb,
            memory_tolerance: 2.0,

            cluster: "potatostack".to_string(),
            scrape_interval: "15s".to_string(),
            alertmanager_target: "alertmanager:9093".to_string(),
            alert_rule_file: "alerts.yml".to_string(),
            scrape_targets: pairs(&[
                ("prometheus", "localhost:9090"),
                ("node-exporter", "node-exporter:9100"),
                ("cadvisor", "cadvisor:8080"),
                ("smartctl", "smartctl-exporter:9633"),
                ("kopia", "kopia:51516"),
            ]),
            docker_sd_jobs: strings(&["docker-containers"]),
            alert_groups: strings(&[
                "system_alerts",
                "smart_alerts",
                "kopia_alerts",
                "vpn_alerts",
                "container_alerts",
            ]),
            alerts: vec![
                AlertSpec::new(
                    "system_alerts",
                    "HighMemoryUsage",
                    Some("warning"),
                    Some(memory_alert_percent.to_string()),
                ),
                AlertSpec::new("system_alerts", "HighCPUUsage", Some("warning"), None),
                AlertSpec::new(
                    "system_alerts",
                    "DiskSpaceLow",
                    Some("critical"),
                    Some(disk_free_percent.to_string()),
                ),
                AlertSpec::new("system_alerts", "HighDiskIO", None, None),
                AlertSpec::new("smart_alerts", "SMARTFailure", Some("critical"), None),
                AlertSpec::new(
                    "smart_alerts",
                    "HighDiskTemperature",
                    Some("warning"),
                    Some(disk_temperature_celsius.to_string()),
                ),
                AlertSpec::new("smart_alerts", "ReallocatedSectors", None, None),
                AlertSpec::new("kopia_alerts", "KopiaBackupFailed", Some("critical"), None),
                AlertSpec::new(
                    "kopia_alerts",
                    "KopiaNoRecentSnapshot",
                    Some("warning"),
                    Some(snapshot_max_age_seconds.to_string()),
                ),
                AlertSpec::new("vpn_alerts", "SurfsharkVPNDown", Some("critical"), None),
                AlertSpec::new("container_alerts", "ContainerDown", None, None),
                AlertSpec::new(
                    "container_alerts",
                    "ContainerHighMemory",
                    None,
                    Some(container_memory_percent.to_string()),
                ),
            ],
            alert_severities: strings(&["critical", "warning", "info"]),

            receivers: strings(&["default", "critical", "warning"]),
            group_by: strings(&["alertname", "cluster", "service"]),
            inhibit_equal: strings(&["alertname", "instance"]),

            loki_port: 3100,
            log_retention: "30d".to_string(),
            loki_push_url: "http://loki:3100/loki/api/v1/push".to_string(),
            log_jobs: strings(&["system", "docker", "kopia", "qbittorrent", "slskd"]),
            host: "lepotato".to_string(),
            docker_socket: "unix:///var/run/docker.sock".to_string(),

            datasources: pairs(&[
                ("Prometheus", "http://prometheus:9090"),
                ("Loki", "http://loki:3100"),
                ("Thanos", "http://thanos-query:10902"),
            ]),
            default_datasource: "Prometheus".to_string(),
            dashboard_provider: "PotatoStack".to_string(),
        }
    }
}

/// Build one built-in rule set by name
pub fn rule_set(name: &str, params: &Parameters) -> Option<Result<RuleSet, RuleSetError>> {
    let set = match name {
        "compose" => compose::rule_set(params),
        "prometheus" => monitoring::prometheus(params),
        "prometheus-alerts" => monitoring::prometheus_alerts(params),
        "alertmanager" => monitoring::alertmanager(params),
        "loki" => monitoring::loki(params),
        "promtail" => monitoring::promtail(params),
        "grafana-datasources" => grafana::datasources(params),
        "grafana-dashboards" => grafana::dashboards(params),
        "homepage-services" => homepage::services(),
        "homepage-bookmarks" => homepage::bookmarks(),
        "homepage-widgets" => homepage::widgets(),
        "homepage-settings" => homepage::settings(),
        "homepage-docker" => homepage::docker(),
        _ => return None,
    };
    Some(set)
}

/// Build every built-in rule set, keyed by name
pub fn all(params: &Parameters) -> Result<BTreeMap<String, RuleSet>, RuleSetError> {
    let mut sets = BTreeMap::new();
    for name in NAMES {
        if let Some(set) = rule_set(name, params) {
            sets.insert(name.to_string(), set?);
        }
    }
    Ok(sets)
}

/// Maps file paths to rule set labels
#[derive(Debug, Clone)]
pub struct Detector {
    globs: GlobSet,
    targets: Vec<String>,
}

impl Detector {
    /// Project overrides are tried before the default table
    pub fn new(overrides: &BTreeMap<String, String>) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        let mut targets = Vec::new();

        let defaults = DETECTION.iter().map(|(g, t)| (*g, *t));
        let custom = overrides.iter().map(|(g, t)| (g.as_str(), t.as_str()));
        for (glob, target) in custom.chain(defaults) {
            builder.add(Glob::new(glob)?);
            targets.push(target.to_string());
        }

        Ok(Self {
            globs: builder.build()?,
            targets,
        })
    }

    /// Rule set label for a file, if any pattern matches
    pub fn detect(&self, path: &Path) -> Option<&str> {
        self.globs
            .matches(path)
            .into_iter()
            .min()
            .map(|i| self.targets[i].as_str())
    }
}

/// Concrete path from plain keys; keys needing quotes are quoted
fn key_path(keys: &[&str]) -> NodePath {
    NodePath::new(keys.iter().map(|k| Segment::Key(k.to_string())).collect())
}

/// Pattern text for a path of plain keys
fn pattern(keys: &[&str]) -> String {
    key_path(keys).to_string()
}

fn rel(path: &str) -> Result<NodePath, PathError> {
    path.parse()
}

/// `then` applied at a relative path
fn at(path: &str, then: Check) -> Result<Check, PathError> {
    Ok(Check::at(rel(path)?, then))
}

fn all_of(checks: Vec<Check>) -> Check {
    Check::AllOf { checks }
}

/// Sequence element whose `field` equals `value`, optionally checked further
fn item(field: &str, value: &str, then: Option<(&str, Check)>) -> Result<Check, PathError> {
    let (at, then) = match then {
        Some((path, check)) => (Some(rel(path)?), Some(Box::new(check))),
        None => (None, None),
    };
    Ok(Check::Item {
        field: field.to_string(),
        equals: value.into(),
        at,
        then,
    })
}
