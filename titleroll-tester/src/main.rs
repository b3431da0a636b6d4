mod reports;
mod seeds;
mod simulation;
mod sources;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;
use titleroll_core::{CatalogFilter, RollConfig};

use seeds::{resolve_seed_inputs, split_csv};
use simulation::{SimulationPlan, SimulationSummary, run_simulation};
use sources::JsonCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "titleroll-tester", version)]
#[command(about = "Simulate title rolls and check observed odds against expected odds")]
struct Args {
    /// Catalog JSON to roll against (defaults to the bundled demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Roll config JSON (boost levels, pruning, fallback)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Active season; entries tagged with another season are skipped
    #[arg(long)]
    season: Option<String>,

    /// Keep inactive entries in the snapshot
    #[arg(long)]
    include_inactive: bool,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Simulated users per seed
    #[arg(long, default_value_t = 1)]
    users: u64,

    /// Rolls per simulated user
    #[arg(long, default_value_t = 10_000)]
    rolls: u64,

    /// Largest allowed gap between observed and expected award share
    #[arg(long, default_value_t = 0.01)]
    tolerance: f64,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let start_time = Instant::now();
    let catalog = load_catalog(&args)?;
    let config = load_config(&args)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let filter = CatalogFilter {
        season: args.season.clone(),
        include_inactive: args.include_inactive,
    };

    let mut summaries = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if args.verbose {
            println!(
                "🎲 Simulating seed {} ({} users × {} rolls)",
                seed.to_string().bright_white(),
                args.users,
                args.rolls
            );
        }
        let plan = SimulationPlan {
            seed,
            users: args.users,
            rolls_per_user: args.rolls,
            filter: filter.clone(),
            tolerance: args.tolerance,
        };
        let summary = run_simulation(&catalog, &config, &plan)
            .with_context(|| format!("simulation failed for seed {seed}"))?;
        summaries.push(summary);
    }

    write_report(&args, &summaries, start_time)?;

    if summaries.iter().any(|s| !s.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn announce_banner() {
    println!("{}", "🎲 Titleroll Odds Tester".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn load_catalog(args: &Args) -> Result<JsonCatalog> {
    match &args.catalog {
        Some(path) => JsonCatalog::load(path),
        None => JsonCatalog::load_default(),
    }
}

fn load_config(args: &Args) -> Result<RollConfig> {
    let Some(path) = &args.config else {
        return Ok(RollConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RollConfig::from_json(&raw).with_context(|| format!("invalid roll config {}", path.display()))
}

fn write_report(args: &Args, summaries: &[SimulationSummary], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, summaries)?,
        ReportFormat::Markdown => reports::generate_markdown_report(&mut output_target, summaries)?,
        ReportFormat::Console => reports::generate_console_report(
            &mut output_target,
            summaries,
            args.tolerance,
            start_time.elapsed(),
        )?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
