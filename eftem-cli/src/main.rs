mod config;
mod stack;

use clap::{Parser, Subcommand};
use config::{DriftConfigJson, JobConfig, MapConfigJson};
use eftem::{predict_edge, DriftConfig, DriftEstimator, ElementalMapping, JobControl, WorkerPool};
use serde::de::DeserializeOwned;
use stack::{DriftOutput, MapOutput, ShiftRecord, Stack};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DRIFT_SCHEMA_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/drift.schema.json"));
const DRIFT_EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/drift.example.json"));
const MAP_SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/map.schema.json"));
const MAP_EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/map.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "EFTEM CLI (JSON config driven)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Enable tracing output for performance profiling.
    #[arg(long, global = true)]
    trace: bool,
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect (and optionally correct) drift of a stack.
    Drift(ConfigArgs),
    /// Compute elemental maps of a drift-corrected stack.
    Map(ConfigArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("eftem=info".parse()?))
            .with_target(false)
            .init();
    }

    match cli.command {
        Command::Drift(args) => {
            if print_requested(&args, DRIFT_SCHEMA_JSON, DRIFT_EXAMPLE_JSON) {
                return Ok(());
            }
            run_drift(&load_config(&args)?)
        }
        Command::Map(args) => {
            if print_requested(&args, MAP_SCHEMA_JSON, MAP_EXAMPLE_JSON) {
                return Ok(());
            }
            run_map(&load_config(&args)?)
        }
    }
}

fn print_requested(args: &ConfigArgs, schema: &str, example: &str) -> bool {
    if args.print_schema {
        println!("{schema}");
        return true;
    }
    if args.print_example {
        println!("{example}");
        return true;
    }
    false
}

fn load_config<T: DeserializeOwned>(args: &ConfigArgs) -> Result<T, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(&args.config)?;
    Ok(serde_json::from_str(&text)?)
}

fn job(job: &JobConfig) -> Result<(WorkerPool, JobControl), Box<dyn std::error::Error>> {
    Ok((
        WorkerPool::new(job.threads)?,
        JobControl::with_timeout(job.timeout()),
    ))
}

fn write_output(path: Option<&str>, json: String) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn run_drift(config: &DriftConfigJson) -> Result<(), Box<dyn std::error::Error>> {
    if config.stack_path.is_empty() {
        return Err("stack_path must be set in the config".into());
    }
    let mut stack = Stack::load(&config.stack_path)?;
    let (pool, control) = job(&config.job)?;
    let estimator = DriftEstimator::new(DriftConfig::from(config), pool);

    let output = match &config.corrected_stack_path {
        Some(path) => {
            let report = estimator.correct(&stack.views(), &control)?;
            stack.frames = report.frames;
            fs::write(path, serde_json::to_string(&stack.to_json())?)?;
            tracing::info!(path = %path, "corrected stack written");
            DriftOutput {
                drift: ShiftRecord::list(&report.drift),
                shift: Some(ShiftRecord::list(&report.shift)),
            }
        }
        None => DriftOutput {
            drift: ShiftRecord::list(&estimator.detect(&stack.views(), &control)?),
            shift: None,
        },
    };
    write_output(
        config.output_path.as_deref(),
        serde_json::to_string_pretty(&output)?,
    )
}

fn run_map(config: &MapConfigJson) -> Result<(), Box<dyn std::error::Error>> {
    if config.stack_path.is_empty() {
        return Err("stack_path must be set in the config".into());
    }
    let stack = Stack::load(&config.stack_path)?;
    let energy_losses = stack.require_energy_losses()?;

    let edge = match config.edge_energy_loss {
        Some(edge) => edge,
        None => {
            let prediction = predict_edge(&energy_losses)?;
            match prediction.edge {
                Some(edge) => tracing::info!(edge = %edge, "predicted ionisation edge"),
                None => tracing::info!("no tabulated edge in range; using midpoint"),
            }
            prediction.energy_loss
        }
    };

    let (pool, control) = job(&config.job)?;
    let mapping = ElementalMapping::new(config.to_mapping_config(edge, stack.exposures()), pool);
    let maps = mapping.run(&stack.views(), &energy_losses, &control)?;
    if maps.error_pixel_count() > 0 {
        tracing::warn!(
            pixels = maps.error_pixel_count(),
            "fit failed for some pixels"
        );
    }
    write_output(
        config.output_path.as_deref(),
        serde_json::to_string(&MapOutput::new(&maps, edge))?,
    )
}
