use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use sqlite_inspector::{checks, report, Check, Inspector, InspectorConfig, OutputFormat};

/// Read-only inspection of the Opagax SQLite database.
#[derive(Debug, Parser)]
#[command(name = "inspector", version, about)]
struct Cli {
    /// Checks to run, in order (all checks when omitted)
    #[arg(value_enum)]
    checks: Vec<Check>,

    /// Database file (defaults to opagax.db)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Additional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site to enumerate in per-site checks; repeat to list several
    #[arg(short, long = "site")]
    sites: Vec<String>,

    /// Rows shown by sample listings
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Debug logging, including every query
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut InspectorConfig) {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if !self.sites.is_empty() {
            config.sites = self.sites.clone();
        }
        if let Some(limit) = self.limit {
            config.sample_limit = limit;
        }
    }

    fn selected_checks(&self) -> Vec<Check> {
        if self.checks.is_empty() {
            Check::all().to_vec()
        } else {
            self.checks.clone()
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("❌ Erreur: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut config =
        InspectorConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    let inspector = Inspector::open(&config.database)?;
    let reports = checks::run_all(&cli.selected_checks(), &inspector, &config)?;
    println!("{}", report::render(&reports, cli.format)?);

    info!(checks = reports.len(), "inspection complete");
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("INSPECTOR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_positional_runs_every_check() {
        let cli = Cli::try_parse_from(["inspector"]).expect("cli should parse");
        assert_eq!(cli.selected_checks(), Check::all());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn checks_keep_command_line_order() {
        let cli =
            Cli::try_parse_from(["inspector", "orphans", "counts"]).expect("cli should parse");
        assert_eq!(cli.selected_checks(), vec![Check::Orphans, Check::Counts]);
    }

    #[test]
    fn unknown_check_is_rejected() {
        assert!(Cli::try_parse_from(["inspector", "everything"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "inspector",
            "--database",
            "/tmp/other.db",
            "-s",
            "SITE_02",
            "-s",
            "SITE_04",
            "--limit",
            "2",
            "--format",
            "json",
            "site-data",
        ])
        .expect("cli should parse");

        let mut config = InspectorConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.database, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.sites, vec!["SITE_02", "SITE_04"]);
        assert_eq!(config.sample_limit, 2);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["inspector", "-q", "-v"]).is_err());
    }
}
