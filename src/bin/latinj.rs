//! latinj - Latency Injection CLI
//!
//! Command-line interface for planting known onset-latency shifts into
//! recorded spike trains and scoring latency detectors against them.

use clap::{Parser, Subcommand};
use latency_inject::data::{read_events_tsv, Recording};
use latency_inject::error::{LatencyError, Result};
use latency_inject::inject::{partition_events_seeded, InjectedData, UnitSelector};
use latency_inject::pipeline::{DetectorCommand, Experiment, ExperimentConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const PARTITION_FILE: &str = "partition.tsv";
const GROUND_TRUTH_FILE: &str = "ground_truth.json";
const RECORDS_FILE: &str = "injection.json";

/// Controlled latency-shift injection for onset-latency detectors
#[derive(Parser)]
#[command(name = "latinj")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split event onsets into two conditions
    Partition {
        /// Path to event onsets TSV
        #[arg(short, long)]
        events: PathBuf,

        /// Random seed (default: 1)
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Output path for the partition TSV
        #[arg(short, long, default_value = PARTITION_FILE)]
        output: PathBuf,
    },

    /// Inject a latency shift into a recording
    Inject {
        /// Path to experiment configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Recording directory (units.tsv, spikes.tsv, events.tsv)
        #[arg(short, long)]
        recording: PathBuf,

        /// Output directory for the injected recording and ground truth
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Inject, then score an external detector against the ground truth
    Validate {
        /// Path to experiment configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Recording directory (units.tsv, spikes.tsv, events.tsv)
        #[arg(short, long)]
        recording: PathBuf,

        /// Detector program (overrides the configuration)
        #[arg(long)]
        program: Option<PathBuf>,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Generate an example experiment configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "experiment.yaml")]
        output: PathBuf,
    },
}

/// Command-line overrides of the configuration file.
#[derive(clap::Args)]
struct Overrides {
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Latency shift in seconds
    #[arg(long, allow_hyphen_values = true)]
    latency: Option<f64>,

    /// Fraction of window spikes to relocate per event
    #[arg(long)]
    fraction: Option<f64>,

    /// Inject only these unit ids (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "indices")]
    units: Option<Vec<String>>,

    /// Inject only the units at these positions after qualification (comma-separated)
    #[arg(long, value_delimiter = ',')]
    indices: Option<Vec<usize>>,

    /// Skip unit qualification
    #[arg(long)]
    all_units: bool,

    /// Inject units in parallel
    #[arg(long)]
    parallel: bool,
}

impl Overrides {
    fn apply(self, mut config: ExperimentConfig) -> ExperimentConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(latency) = self.latency {
            config.injection.latency = latency;
        }
        if let Some(fraction) = self.fraction {
            config.injection.fraction = fraction;
        }
        if let Some(ids) = self.units {
            config.injection.unit_selector = UnitSelector::Ids(ids);
        }
        if let Some(indices) = self.indices {
            config.injection.unit_selector = UnitSelector::Indices(indices);
        }
        if self.all_units {
            config.qualification = None;
        }
        config.parallel |= self.parallel;
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "latency_inject=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Partition {
            events,
            seed,
            output,
        } => cmd_partition(&events, seed, &output),

        Commands::Inject {
            config,
            recording,
            output,
            overrides,
        } => cmd_inject(config.as_deref(), &recording, &output, overrides),

        Commands::Validate {
            config,
            recording,
            program,
            output,
            overrides,
        } => cmd_validate(&config, &recording, program, output.as_deref(), overrides),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<ExperimentConfig> {
    let config = match path {
        Some(path) => {
            eprintln!("Loading experiment configuration from {:?}...", path);
            ExperimentConfig::from_file(path)?
        }
        None => ExperimentConfig::default(),
    };
    Ok(overrides.apply(config))
}

fn load_recording(path: &Path) -> Result<Recording> {
    eprintln!("Loading recording from {:?}...", path);
    let recording = Recording::from_tsv_dir(path)?;
    eprintln!(
        "Loaded {} units x {} events",
        recording.n_units(),
        recording.events().len()
    );
    Ok(recording)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Split events into two conditions
fn cmd_partition(events_path: &Path, seed: u64, output_path: &Path) -> Result<()> {
    let events = read_events_tsv(events_path)?;
    let partition = partition_events_seeded(&events, seed)?;
    partition.to_tsv(output_path)?;

    eprintln!(
        "Wrote {} + {} events to {:?}",
        partition.condition_1.len(),
        partition.condition_2.len(),
        output_path
    );
    Ok(())
}

fn write_injection(output_dir: &Path, injected: &InjectedData) -> Result<()> {
    injected.recording.to_tsv_dir(output_dir)?;
    injected.partition.to_tsv(output_dir.join(PARTITION_FILE))?;
    write_json(&output_dir.join(GROUND_TRUTH_FILE), &injected.ground_truth())?;
    write_json(&output_dir.join(RECORDS_FILE), &injected.records)?;
    Ok(())
}

/// Inject and write the modified recording
fn cmd_inject(
    config_path: Option<&Path>,
    recording_path: &Path,
    output_dir: &Path,
    overrides: Overrides,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let recording = load_recording(recording_path)?;

    eprintln!("Running experiment '{}'...", config.name);
    let run = Experiment::from_config(&config).inject(&recording)?;
    if !run.removed_units.is_empty() {
        eprintln!("  {} units failed qualification", run.removed_units.len());
    }

    eprintln!("Writing injected recording to {:?}...", output_dir);
    write_injection(output_dir, &run.injected)?;

    let truth = run.injected.ground_truth();
    eprintln!(
        "Done! {} spikes relocated across {} units",
        run.injected.total_moved(),
        truth.injected_units.len()
    );
    eprintln!("  Expected onset: {:.4} s", truth.expected_onset);
    Ok(())
}

/// Inject and score an external detector
fn cmd_validate(
    config_path: &Path,
    recording_path: &Path,
    program: Option<PathBuf>,
    output_path: Option<&Path>,
    overrides: Overrides,
) -> Result<()> {
    let mut config = load_config(Some(config_path), overrides)?;
    if let Some(program) = program {
        match config.command.as_mut() {
            Some(command) => command.program = program,
            None => {
                config.command = Some(DetectorCommand {
                    program,
                    args: Vec::new(),
                    timeout_secs: None,
                })
            }
        }
    }
    let detector = config
        .command
        .as_ref()
        .ok_or_else(|| {
            LatencyError::invalid("no detector program: set `command` in the config or pass --program")
        })?
        .build()?;

    let recording = load_recording(recording_path)?;

    eprintln!("Running experiment '{}'...", config.name);
    let result = Experiment::from_config(&config).run(&recording, &detector)?;

    println!("{}", result.validation);

    if let Some(path) = output_path {
        eprintln!("Writing results to {:?}...", path);
        write_json(path, &result.validation)?;
    }
    Ok(())
}

/// Write an example experiment configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let experiment = Experiment::new()
        .name("example-latency-injection")
        .seed(1)
        .window(0.1, 0.1)
        .fraction(0.25)
        .latency(0.0)
        .select(UnitSelector::Indices(vec![15, 18, 19]));

    let mut config = experiment.to_config().clone();
    config.description = Some(
        "Relocate a quarter of the 100-200 ms spikes of three units onto condition-2 trials"
            .to_string(),
    );
    config.command = Some(DetectorCommand {
        program: PathBuf::from("./latenzy2-detector"),
        args: Vec::new(),
        timeout_secs: Some(600.0),
    });
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example experiment to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
