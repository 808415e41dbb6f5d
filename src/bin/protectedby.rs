//! protectedby: check "protected by" lock annotations in Rust sources
//!
//! Usage: protectedby check [PATHS] [options]

use anyhow::Context;
use clap::{Parser, Subcommand};
use protected_by::error::RULES;
use protected_by::{check, frontend, Config};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "protectedby")]
#[command(about = "Checks that fields documented as \"protected by\" a lock are only accessed under it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check source files for unprotected accesses and invalid directives
    Check {
        /// Files or directories to check (default: current directory)
        paths: Vec<PathBuf>,

        /// Skip files whose path matches this regex
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Only report diagnostics of this rule
        #[arg(long, action = clap::ArgAction::Append)]
        rule: Vec<String>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// JSON configuration file; flags given on the command line override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of parallel jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Name of the lock's acquire method (default: lock)
        #[arg(long)]
        acquire: Option<String>,

        /// Name of the lock's release method (default: unlock)
        #[arg(long)]
        release: Option<String>,

        /// Ignore "// want" annotations in directives (self-test mode)
        #[arg(long)]
        testrun: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Describe a rule
    Explain {
        /// Rule identifier, e.g. unprotected-access
        rule: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Human,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Expected: human, json", s)),
        }
    }
}

/// Options of the `check` subcommand.
struct CheckArgs {
    paths: Vec<PathBuf>,
    exclude: Vec<String>,
    rules: Vec<String>,
    format: OutputFormat,
    config: Config,
}

/// Configuration flags of the `check` subcommand, layered over a config file.
#[derive(Default)]
struct ConfigOverrides {
    file: Option<PathBuf>,
    jobs: Option<usize>,
    acquire: Option<String>,
    release: Option<String>,
    testrun: bool,
}

impl ConfigOverrides {
    fn load(self) -> anyhow::Result<Config> {
        let mut config = match &self.file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<Config>(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Config::new(),
        };
        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        if self.acquire.is_some() || self.release.is_some() {
            let acquire = self.acquire.unwrap_or(config.acquire.clone());
            let release = self.release.unwrap_or(config.release.clone());
            config = config.with_lock_methods(acquire, release);
        }
        if self.testrun {
            config = config.with_test_mode(true);
        }
        // A config file may say zero.
        config.jobs = config.jobs.max(1);
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check {
            paths,
            exclude,
            rule,
            format,
            config,
            jobs,
            acquire,
            release,
            testrun,
            verbose,
        } => {
            init_tracing(verbose);
            let overrides = ConfigOverrides {
                file: config,
                jobs,
                acquire,
                release,
                testrun,
            };
            let result = overrides.load().and_then(|config| {
                handle_check(CheckArgs {
                    paths,
                    exclude,
                    rules: rule,
                    format,
                    config,
                })
            });
            match result {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    2
                }
            }
        }
        Commands::Explain { rule } => handle_explain(&rule),
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns 0 for a clean run and 1 when anything was reported.
fn handle_check(args: CheckArgs) -> anyhow::Result<i32> {
    let roots = if args.paths.is_empty() {
        vec![std::env::current_dir()?]
    } else {
        args.paths
    };

    debug!(config = %serde_json::to_string(&args.config)?, "effective configuration");

    let rules = cli::filters::validate_rules(&args.rules)?;
    let exclude = cli::filters::PathFilter::new(&args.exclude)?;
    let files = cli::discover::discover_sources(&roots, &exclude)?;
    debug!(files = files.len(), "discovered source files");

    let (program, errors) = frontend::parse_files(&files);
    for error in &errors {
        warn!("skipping file: {}", error);
        eprintln!("warning: {}", error);
    }

    let mut report = check(&program, &args.config);
    report.retain_rules(&rules);

    print!("{}", cli::output::format_report(&report, args.format));

    Ok(if report.is_clean() { 0 } else { 1 })
}

fn handle_explain(rule: &str) -> i32 {
    match RULES.iter().find(|(name, _)| *name == rule) {
        Some((name, description)) => {
            println!("{}: {}", name, description);
            0
        }
        None => {
            let known: Vec<_> = RULES.iter().map(|(name, _)| *name).collect();
            eprintln!("Unknown rule: {}. Expected one of: {}", rule, known.join(", "));
            2
        }
    }
}
