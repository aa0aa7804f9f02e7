//! Conform CLI - configuration conformance checker
//!
//! Checks YAML/JSON configuration files against built-in and custom rule sets.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use conform::builtin::{self, Detector};
use conform::config::{ColorMode, Config, OutputFormat};
use conform::engine::{Binding, Evaluator};
use conform::loader::load_documents;
use conform::output;
use conform::rule::Rule;
use conform::rule_set::RuleSet;
use conform::Severity;
use glob::glob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "conform",
    version,
    about = "Configuration conformance checker",
    long_about = "Checks YAML/JSON configuration files against rule sets. Ships rules for a \
                  Docker Compose monitoring stack (Prometheus, Alertmanager, Loki, Promtail, \
                  Grafana, Homepage)."
)]
struct Cli {
    /// Files or glob patterns to check
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Show passed outcomes and debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Select rules by prefix (e.g., 'loki' selects all loki* rules)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Ignore rules by prefix (e.g., 'compose-kopia' ignores all compose-kopia* rules)
    #[arg(long, value_delimiter = ',')]
    ignore: Option<Vec<String>>,

    /// Additional rule set files (YAML/JSON)
    #[arg(long = "rules", value_name = "FILE")]
    rules: Vec<PathBuf>,

    /// Bind a document label to a rule set label (DOC=SET)
    #[arg(long = "bind", value_name = "DOC=SET")]
    bind: Vec<Binding>,

    /// List available rule sets and rules, then exit
    #[arg(long)]
    list_rules: bool,

    /// Exit with 0 even if errors are found
    #[arg(long)]
    exit_zero: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detailed information about a rule
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },
    /// Initialize a configuration file
    Init {
        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        output_format: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Github,
    Compact,
    Junit,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Github => OutputFormat::Github,
            Format::Compact => OutputFormat::Compact,
            Format::Junit => OutputFormat::Junit,
        }
    }
}

fn severity_str(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    }
}

/// Print a rule in a consistent format
fn print_rule(rule: &Rule) {
    let disabled = if rule.enabled {
        "".normal()
    } else {
        " [disabled]".yellow()
    };

    println!(
        "    {} [{}] {}{}",
        rule.id.cyan(),
        severity_str(rule.severity),
        rule.pattern,
        disabled
    );
    if let Some(desc) = &rule.description {
        println!("      {}", desc);
    }
    if !rule.tags.is_empty() {
        println!("      Tags: {}", rule.tags.join(", "));
    }
}

/// Print detailed rule explanation
fn explain_rule(set: &RuleSet, rule: &Rule) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), rule.id.cyan());
    println!("  {}: {}", "Rule set".bold(), set.name());
    println!("  {}: {}", "Severity".bold(), severity_str(rule.severity));
    println!("  {}: {}", "Pattern".bold(), rule.pattern);
    println!(
        "  {}: {}",
        "Requires a match".bold(),
        if rule.require_match { "yes" } else { "no" }
    );

    println!();
    println!("  {}", "Check".bold());
    println!("  matches must {}", rule.check.expectation());

    if let Some(desc) = &rule.description {
        println!();
        println!("  {}", "Description".bold());
        println!("  {}", desc);
    }

    if !rule.message.is_empty() {
        println!();
        println!("  {}: {}", "Message".bold(), rule.message);
    }

    if let Some(docs) = &rule.docs {
        println!();
        println!("  {}: {}", "Documentation".bold(), docs.blue());
    }

    if !rule.tags.is_empty() {
        println!();
        println!("  {}: {}", "Tags".bold(), rule.tags.join(", "));
    }
}

/// Handle the explain command
fn handle_explain(rule_id: &str, rule_sets: &BTreeMap<String, RuleSet>) -> Result<i32> {
    let found = rule_sets
        .values()
        .find_map(|set| set.get(rule_id).map(|rule| (set, rule)));

    match found {
        Some((set, rule)) => {
            explain_rule(set, rule);
            Ok(0)
        }
        None => {
            eprintln!("{}: Rule '{}' not found", "error".red().bold(), rule_id);
            eprintln!();
            eprintln!("Use {} to see all available rules", "--list-rules".cyan());
            Ok(1)
        }
    }
}

/// Handle the init command
fn handle_init(output_format: &str, force: bool) -> Result<i32> {
    let filename = match output_format {
        "json" => ".conformrc.json",
        "yaml" | "yml" => ".conformrc.yaml",
        other => bail!("Unknown output format '{}'. Available: yaml, json", other),
    };

    if Path::new(filename).exists() && !force {
        eprintln!(
            "{}: {} already exists. Remove it first or pass --force.",
            "error".red().bold(),
            filename
        );
        return Ok(1);
    }

    let mut config = Config::new();
    config.parameters = match serde_yaml::to_value(builtin::Parameters::default())? {
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => serde_yaml::Mapping::new(),
    };

    let content = if output_format == "json" {
        serde_json::to_string_pretty(&config)?
    } else {
        format!(
            "# Conform configuration\n# Generated with: conform init\n\n{}",
            serde_yaml::to_string(&config)?
        )
    };

    std::fs::write(filename, content).with_context(|| format!("Failed to write {}", filename))?;

    println!("{} Created {}", "success".green().bold(), filename);
    println!();
    println!("Next steps:");
    println!("  1. Adjust the parameters to your stack");
    println!("  2. Run {} to check your files", "conform **/*.yml".cyan());
    Ok(0)
}

/// Built-in rule sets, then configured rule files, then `--rules` files
fn load_rule_sets(config: &Config, extra: &[PathBuf]) -> Result<BTreeMap<String, RuleSet>> {
    let params = config.parameters()?;
    let mut rule_sets = builtin::all(&params)?;

    for (label, path) in &config.rule_sets {
        let set = RuleSet::load(path)
            .with_context(|| format!("Failed to load rule set '{}'", label))?;
        rule_sets.insert(label.clone(), set);
    }

    for path in extra {
        let set = RuleSet::load(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        log::debug!("loaded {} rule(s) from {}", set.len(), path.display());
        rule_sets.insert(set.name().to_string(), set);
    }

    Ok(rule_sets)
}

/// Expand glob patterns into files
fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        let before = files.len();
        for entry in paths.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
        if files.len() == before {
            log::warn!("no files match '{}'", pattern);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn list_rules(rule_sets: &BTreeMap<String, RuleSet>) {
    println!("{}", "Available rules:".bold());
    println!();
    for (label, set) in rule_sets {
        match set.description() {
            Some(desc) => println!("  {} ({} rules): {}", label.cyan(), set.len(), desc),
            None => println!("  {} ({} rules):", label.cyan(), set.len()),
        }
        for rule in set.rules() {
            print_rule(rule);
        }
        println!();
    }
}

fn run(cli: Cli) -> Result<i32> {
    if let Some(Commands::Init {
        output_format,
        force,
    }) = &cli.command
    {
        return handle_init(output_format, *force);
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    // Merge CLI arguments
    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
    );
    if let Some(prefixes) = cli.select.clone() {
        config.add_select_prefixes(prefixes);
    }
    if let Some(prefixes) = cli.ignore.clone() {
        config.add_ignore_prefixes(prefixes);
    }

    match config.output.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    let rule_sets = load_rule_sets(&config, &cli.rules)?;

    if let Some(Commands::Explain { rule_id }) = &cli.command {
        return handle_explain(rule_id, &rule_sets);
    }

    if cli.list_rules {
        list_rules(&rule_sets);
        return Ok(0);
    }

    // Documents: configured labels, then files from the command line
    let mut files = config.documents.clone();
    let mut bindings = config.bindings.clone();
    let detector = Detector::new(&config.detect).context("Invalid detect pattern")?;

    for path in expand_files(&cli.files)? {
        let label = path.display().to_string();
        match detector.detect(&path) {
            Some(set) => {
                let binding = Binding::new(&label, set);
                if !bindings.contains(&binding) {
                    bindings.push(binding);
                }
            }
            None if cli.bind.iter().any(|b| b.document == label) => {}
            None => log::warn!("no rule set detected for {}", label),
        }
        files.insert(label, path);
    }

    for binding in &cli.bind {
        if !bindings.contains(binding) {
            bindings.push(binding.clone());
        }
    }

    if bindings.is_empty() {
        if cli.files.is_empty() && config.documents.is_empty() {
            eprintln!("{}: No files specified", "error".red().bold());
            eprintln!();
            eprintln!("Usage: conform [OPTIONS] <FILES>...");
            eprintln!();
            eprintln!("For more information, try '--help'");
        } else {
            eprintln!("{}: Nothing to check: no file is bound to a rule set", "error".red().bold());
        }
        return Ok(2);
    }

    let (documents, load_errors) = load_documents(&files);
    for (label, error) in &load_errors {
        eprintln!("{}: {}: {}", "error".red().bold(), label, error);
    }

    let report = Evaluator::from_config(&config).run(&documents, &rule_sets, &bindings);

    let colored = !cli.no_color && config.output.color != ColorMode::Never;
    let formatter = output::formatter(
        config.output.format,
        colored,
        config.output.verbose,
        config.output.statistics,
    );
    print!("{}", formatter.format(&report));

    let exit_code = if load_errors.is_empty() {
        report.exit_code()
    } else {
        2
    };
    Ok(if cli.exit_zero { 0 } else { exit_code })
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let exit_code = run(cli).unwrap_or_else(|e| {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        2
    });
    std::process::exit(exit_code);
}
