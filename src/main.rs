//! Fresnel - browser performance scenarios, recorded and compared
//!
//! Loads configured pages in headless Chromium, records probe data
//! over several runs, and compares two recordings statistically.
//!
//! Exit codes:
//!   0 - Success (no regressions)
//!   1 - Runtime error (config, browser, probe, I/O, etc.)
//!   2 - Comparison found regressions

mod analysis;
mod browser;
mod cli;
mod config;
mod error;
mod models;
mod probes;
mod recorder;
mod registry;
mod report;
mod reports;
mod writer;

use analysis::{compare_records, CompareMethod, CompareOptions};
use anyhow::{Context, Result};
use browser::{ChromeLauncher, LaunchOptions};
use cli::{Args, Command, OutputFormat};
use config::Config;
use models::Record;
use recorder::Recorder;
use report::ProgressPrinter;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match &args.command {
        Command::Version => {
            println!("Fresnel {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Init { force } => return handle_init(*force),
        _ => {}
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Fresnel v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = match &args.command {
        Command::Record { label } => run_record(&args, label).await,
        Command::Compare {
            before,
            after,
            format,
            method,
            significance,
        } => run_compare(&args.dir, before, after, *format, *method, *significance),
        Command::Init { .. } | Command::Version => Ok(0),
    };

    match outcome {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `fresnel init`: write a starter `.fresnel.yml`.
fn handle_init(force: bool) -> Result<()> {
    let path = Path::new(config::CONFIG_FILES[0]);

    if path.exists() && !force {
        eprintln!("⚠️  .fresnel.yml already exists. Use --force to overwrite it.");
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_yaml()).context("Failed to write .fresnel.yml")?;

    println!("✅ Created .fresnel.yml with an example scenario.");
    println!("   Edit the url and viewport, then run `fresnel record`.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load the scenario file given on the command line, or the one in the
/// current directory.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let path = Config::find(&cwd).with_context(|| {
        format!(
            "No {} found in {}. Run `fresnel init` to create one.",
            config::CONFIG_FILES.join(" or "),
            cwd.display()
        )
    })?;
    info!("Loading config from: {}", path.display());
    Config::load(&path)
}

/// Record every scenario. Returns exit code 0.
async fn run_record(args: &Args, label: &str) -> Result<i32> {
    let config = load_config(args)?;

    let env: BTreeMap<String, String> = std::env::vars().collect();
    let recorder = Recorder::new(Box::new(ChromeLauncher))
        .launch_options(LaunchOptions::from_flags(args.chromium_flags.as_deref()))
        .env(env);

    let printer = ProgressPrinter::new(!args.quiet && std::io::stderr().is_terminal());
    let result = recorder
        .record(&config, &args.dir, label, &|event| printer.handle(event))
        .await;
    printer.abandon();

    let record = result.with_context(|| format!("Recording \"{}\" failed", label))?;

    println!("\n📊 Recording Summary:");
    for (key, scenario) in &record.scenarios {
        println!(
            "   {}: {} run(s), reports: {}",
            key,
            scenario.runs.len(),
            if scenario.options.reports.is_empty() {
                "none".to_string()
            } else {
                scenario.options.reports.join(", ")
            }
        );
    }
    println!(
        "   Saved to: {}",
        Record::path(&args.dir, label).display()
    );

    Ok(0)
}

/// Compare two recordings. Returns exit code 0 or 2.
fn run_compare(
    dir: &Path,
    before: &str,
    after: &str,
    format: OutputFormat,
    method: CompareMethod,
    significance: f64,
) -> Result<i32> {
    let record_a = Record::load(dir, before)
        .with_context(|| format!("Failed to read recording \"{}\"", before))?;
    let record_b = Record::load(dir, after)
        .with_context(|| format!("Failed to read recording \"{}\"", after))?;

    let options = CompareOptions {
        method,
        significance,
    };
    info!("Comparing \"{}\" with \"{}\" ({})", before, after, method);
    let comparison = compare_records(&record_a, &record_b, &reports::registry(), &options)?;

    let output = match format {
        OutputFormat::Text => {
            report::generate_text_comparison(&comparison, std::io::stdout().is_terminal())
        }
        OutputFormat::Markdown => report::generate_markdown_comparison(&comparison),
        OutputFormat::Json => report::generate_json_comparison(&comparison)?,
    };
    println!("{}", output);

    let counts = analysis::judgement::tally(&comparison);
    debug!("Judgements: {:?}", counts);

    if comparison.is_failing() {
        eprintln!(
            "\n⛔ {} metric(s) regressed. Failing (exit code 2).",
            comparison.warnings.len()
        );
        for warning in &comparison.warnings {
            eprintln!(
                "   {} / {}: {} ({})",
                warning.scenario,
                warning.report,
                warning.caption,
                report::generator::format_value(warning.diff, &warning.compare_unit, true)
            );
        }
        return Ok(2);
    }

    Ok(0)
}
