//! `tickgen` entry point.
//!
//! Issues monotonic FILETIME ticks, converts between ticks and RFC 3339
//! timestamps, and runs a concurrent uniqueness check against a shared
//! generator. Ticks go to stdout; logs go to stderr.

mod check;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tick_common::config::{ClockKind, OutputConfig, OutputFormat, TickConfig};
use tick_common::time::Tick;
use tick_source::TickGenerator;
use tracing::{info, warn};

use crate::check::run_check;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "tickgen",
    about = "Monotonic FILETIME tick generator - 100ns intervals since 1601-01-01",
    version,
    long_about = None
)]
struct Args {
    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Wall clock: precise, coarse or system (overrides config file).
    #[arg(long, value_name = "CLOCK", global = true)]
    clock: Option<ClockKind>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Issue ticks (default).
    Next {
        /// Number of ticks to issue.
        #[arg(long, short = 'n', default_value = "1")]
        count: u64,

        /// Append the RFC 3339 rendering of each tick.
        #[arg(long)]
        civil: bool,

        /// Emit one JSON object per line.
        #[arg(long)]
        json: bool,

        /// Print generator statistics to stderr when done.
        #[arg(long)]
        stats: bool,
    },

    /// Render a tick as an RFC 3339 timestamp.
    Decode {
        /// Tick value (100ns intervals since 1601-01-01T00:00:00Z).
        #[arg(allow_negative_numbers = true)]
        tick: i64,
    },

    /// Convert an RFC 3339 timestamp to a tick.
    Encode {
        /// Timestamp such as 2001-01-01T00:00:00Z.
        timestamp: String,
    },

    /// Check uniqueness and ordering with concurrent callers.
    Check {
        /// Worker threads sharing one generator.
        #[arg(long, short = 't', default_value = "4")]
        threads: usize,

        /// Ticks issued by each worker.
        #[arg(long, default_value = "10000")]
        per_thread: usize,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::Next {
            count: 1,
            civil: false,
            json: false,
            stats: false,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let mut config = load_config(&args)?;
    if let Some(clock) = args.clock {
        config.generator.clock = clock;
    }
    info!(clock = %config.generator.clock, "Configuration loaded");

    match args.command.clone().unwrap_or_default() {
        Command::Next {
            count,
            civil,
            json,
            stats,
        } => {
            if civil {
                config.output.civil = true;
            }
            if json {
                config.output.format = OutputFormat::Json;
            }
            run_next(&config, count, stats)
        }
        Command::Decode { tick } => {
            let civil = Tick::new(tick)
                .to_rfc3339()
                .ok_or_else(|| anyhow!("tick {tick} is outside the RFC 3339 range (1970-9999)"))?;
            println!("{civil}");
            Ok(())
        }
        Command::Encode { timestamp } => {
            let tick = Tick::parse_rfc3339(&timestamp)?;
            println!("{tick}");
            Ok(())
        }
        Command::Check {
            threads,
            per_thread,
            json,
        } => {
            let generator = TickGenerator::from_config(&config.generator);
            let report = run_check(&generator, threads, per_thread)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            if !report.passed() {
                return Err(anyhow!(
                    "uniqueness check failed: {} duplicates, {} ordering violations",
                    report.duplicates,
                    report.ordering_violations
                ));
            }
            Ok(())
        }
    }
}

/// Initialize logging on stderr with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("tick_cli={level},tick_source={level},tick_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `TICKGEN_CONFIG` environment variable
/// 3. `/etc/tickgen/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<TickConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return TickConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("TICKGEN_CONFIG") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from TICKGEN_CONFIG");
            return TickConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from TICKGEN_CONFIG={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "TICKGEN_CONFIG set but file does not exist, checking other locations"
        );
    }

    for candidate in ["/etc/tickgen/config.toml", "config/default.toml"] {
        let config_path = PathBuf::from(candidate);
        if config_path.exists() {
            info!(?config_path, "Loading config");
            return TickConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from {config_path:?}"));
        }
    }

    info!("No config file found, using built-in defaults");
    Ok(TickConfig::default())
}

/// Issue `count` ticks to stdout.
fn run_next(config: &TickConfig, count: u64, print_stats: bool) -> Result<()> {
    let generator = TickGenerator::from_config(&config.generator);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for _ in 0..count {
        let tick = generator.next_tick().context("Failed to issue tick")?;
        writeln!(out, "{}", render_tick(tick, &config.output)?)?;
    }
    out.flush()?;

    let stats = generator.stats();
    info!(
        issued = stats.issued,
        fallbacks = stats.fallbacks,
        max_lead = %humantime::format_duration(stats.max_lead()),
        "Done"
    );
    if print_stats {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }
    Ok(())
}

/// One line of JSON output.
#[derive(Debug, Serialize)]
struct TickRecord {
    tick: Tick,
    #[serde(skip_serializing_if = "Option::is_none")]
    civil: Option<String>,
}

/// Format a tick according to the output configuration.
fn render_tick(tick: Tick, output: &OutputConfig) -> Result<String> {
    let civil = if output.civil {
        Some(tick.to_rfc3339().unwrap_or_else(|| String::from("-")))
    } else {
        None
    };

    match output.format {
        OutputFormat::Plain => Ok(match civil {
            Some(civil) => format!("{tick}\t{civil}"),
            None => tick.to_string(),
        }),
        OutputFormat::Json => Ok(serde_json::to_string(&TickRecord { tick, civil })?),
    }
}
