//! meltgen - synthetic MELT data generator CLI
//!
//! Usage:
//!   meltgen generate --size 1GB --anomalies cpu_spike,error_burst -o ./output
//!   meltgen generate --size 10GB --streaming --chunk-size-mb 100
//!   meltgen validate --data-dir ./output
//!   meltgen detect --input-dir ./output
//!   meltgen info --data-dir ./output
//!   meltgen config-template

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use meltgen::config::{GenerationConfig, Settings};
use meltgen::generator::MeltGenerator;
use meltgen::inject::{AnomalyKind, parse_kinds};
use meltgen::sink::{JsonlSink, write_reports};
use meltgen::stream::{ChunkedGenerator, GenerationStats};

#[derive(Parser)]
#[command(name = "meltgen")]
#[command(version)]
#[command(about = "Generate realistic synthetic observability data (metrics, events, logs, traces)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic MELT data
    Generate {
        /// Target data size (e.g. 100MB, 1GB, 10GB)
        #[arg(long, default_value = "1GB")]
        size: String,

        /// Anomalies to inject (comma-separated:
        /// cpu_spike,service_outage,latency_spike,error_burst,all)
        #[arg(long)]
        anomalies: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Path to a YAML settings file (overrides --seed and --duration)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Duration in hours
        #[arg(long, default_value_t = 24.0)]
        duration: f64,

        /// Comma-separated list of services
        #[arg(long)]
        services: Option<String>,

        /// Use chunked streaming generation for large datasets
        #[arg(long)]
        streaming: bool,

        /// Chunk size in MB for streaming generation
        #[arg(long, default_value_t = 100)]
        chunk_size_mb: u64,
    },

    /// Validate generated data schemas
    Validate {
        /// Directory containing generated data
        #[arg(long)]
        data_dir: PathBuf,

        /// Output file for the validation report
        #[arg(short, long, default_value = "./validation_report.json")]
        output: PathBuf,
    },

    /// Run threshold anomaly detection over generated data
    Detect {
        /// Directory containing generated data
        #[arg(long)]
        input_dir: PathBuf,

        /// Output file for the detection report
        #[arg(short, long, default_value = "./anomaly_report.json")]
        output: PathBuf,
    },

    /// Display information about a generated dataset
    Info {
        /// Directory containing generated data
        #[arg(long)]
        data_dir: PathBuf,
    },

    /// Write a template YAML settings file
    ConfigTemplate {
        /// Destination path
        #[arg(short, long, default_value = "meltgen.yaml")]
        output: PathBuf,
    },

    /// List supported anomaly kinds
    ListAnomalies,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            size,
            anomalies,
            output,
            seed,
            config,
            duration,
            services,
            streaming,
            chunk_size_mb,
        } => run_generate(
            size,
            anomalies,
            output,
            seed,
            config,
            duration,
            services,
            streaming,
            chunk_size_mb,
        ),
        Commands::Validate { data_dir, output } => run_validate(data_dir, output),
        Commands::Detect { input_dir, output } => run_detect(input_dir, output),
        Commands::Info { data_dir } => run_info(data_dir),
        Commands::ConfigTemplate { output } => run_config_template(output),
        Commands::ListAnomalies => {
            for kind in AnomalyKind::ORDERED {
                println!("{kind}");
            }
            println!("all");
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    size: String,
    anomalies: Option<String>,
    output: PathBuf,
    seed: u64,
    config_path: Option<PathBuf>,
    duration: f64,
    services: Option<String>,
    streaming: bool,
    chunk_size_mb: u64,
) -> anyhow::Result<()> {
    let mut settings = match &config_path {
        Some(path) => Settings::load(path)?,
        None => Settings {
            generation: GenerationConfig {
                seed,
                duration_hours: duration,
                ..GenerationConfig::default()
            },
            ..Settings::default()
        },
    };

    if let Some(list) = services {
        settings.generation.services = list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    let kinds: Vec<AnomalyKind> = match &anomalies {
        Some(csv) => parse_kinds(csv)?,
        None => Vec::new(),
    };

    banner(&[
        ("Size", size.as_str()),
        ("Output", &output.display().to_string()),
        (
            "Anomalies",
            anomalies.as_deref().unwrap_or("none"),
        ),
        ("Mode", if streaming { "streaming" } else { "standard" }),
    ]);

    let stats = if streaming {
        let generator =
            ChunkedGenerator::new(settings.generation.clone(), settings.anomalies.clone())?
                .with_chunk_size_mb(chunk_size_mb);
        let mut sink = JsonlSink::create(&output)?;
        let mut stats = generator.run(&size, &kinds, &mut sink)?;
        sink.finish()?;
        write_reports(
            &output,
            &settings.generation,
            &settings.anomalies,
            &kinds,
            &mut stats,
            "streaming",
        )?;
        stats
    } else {
        let generator =
            MeltGenerator::new(settings.generation.clone(), settings.anomalies.clone())?;
        let data = generator
            .generate(&size, &kinds)
            .context("generation failed")?;
        generator.save(&data, &output, &kinds)?
    };

    print_stats(&stats);
    eprintln!("Generation complete. Data saved to {}", output.display());
    Ok(())
}

fn run_validate(data_dir: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let report = meltgen::validate::validate_directory(&data_dir)?;

    std::fs::write(&output, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("cannot write {}", output.display()))?;

    eprintln!("Validation summary:");
    eprintln!("  Total files:   {}", report.summary.total_files);
    eprintln!("  Valid files:   {}", report.summary.valid_files);
    eprintln!("  Invalid files: {}", report.summary.invalid_files);
    eprintln!("  Total records: {}", report.summary.total_records);

    if !report.is_valid() {
        anyhow::bail!("validation failed; see {}", output.display());
    }
    eprintln!("All data is valid.");
    Ok(())
}

fn run_detect(input_dir: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let report = meltgen::detect::detect_anomalies(&input_dir)?;

    std::fs::write(&output, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("cannot write {}", output.display()))?;

    eprintln!("Anomaly detection summary:");
    eprintln!("  Total anomalies: {}", report.summary.total_anomalies);
    eprintln!("  CPU spikes:      {}", report.summary.cpu_spikes);
    eprintln!("  Latency spikes:  {}", report.summary.latency_spikes);
    eprintln!("  Error bursts:    {}", report.summary.error_bursts);
    eprintln!("  Service outages: {}", report.summary.service_outages);
    eprintln!("Detailed report saved to {}", output.display());
    Ok(())
}

fn run_info(data_dir: PathBuf) -> anyhow::Result<()> {
    let metadata_path = data_dir.join(meltgen::sink::METADATA_FILE);
    let stats_path = data_dir.join(meltgen::sink::STATISTICS_FILE);

    if !data_dir.exists() {
        anyhow::bail!("directory {} does not exist", data_dir.display());
    }

    if metadata_path.exists() {
        let metadata: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)
                .with_context(|| format!("cannot parse {}", metadata_path.display()))?;

        eprintln!("MELT dataset information");
        eprintln!("  Generated at:      {}", metadata["generated_at"].as_str().unwrap_or("?"));
        eprintln!("  Generator version: {}", metadata["generator_version"].as_str().unwrap_or("?"));
        eprintln!("  Mode:              {}", metadata["generation_mode"].as_str().unwrap_or("?"));
        if let Some(types) = metadata["data_types"].as_array() {
            let names: Vec<&str> = types.iter().filter_map(|t| t.as_str()).collect();
            eprintln!("  Data types:        {}", names.join(", "));
        }
        eprintln!("  Seed:              {}", metadata["generation_config"]["seed"]);
    }

    if stats_path.exists() {
        let stats: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&stats_path)?)
            .with_context(|| format!("cannot parse {}", stats_path.display()))?;

        eprintln!("Statistics:");
        eprintln!("  Total records: {}", stats["total_records"]);
        eprintln!("  Metrics:       {}", stats["metrics_count"]);
        eprintln!("  Events:        {}", stats["events_count"]);
        eprintln!("  Logs:          {}", stats["logs_count"]);
        eprintln!("  Traces:        {}", stats["traces_count"]);
        eprintln!("  Output size:   {} MB", stats["output_size_mb"]);
    }

    for family in meltgen::model::Family::ALL {
        let path = data_dir.join(family.file_name());
        if let Ok(meta) = std::fs::metadata(&path) {
            eprintln!(
                "  {}: {:.1} MB",
                family.file_name(),
                meta.len() as f64 / (1024.0 * 1024.0)
            );
        }
    }

    Ok(())
}

fn run_config_template(output: PathBuf) -> anyhow::Result<()> {
    let yaml = Settings::default().to_yaml()?;
    std::fs::write(&output, yaml)
        .with_context(|| format!("cannot write {}", output.display()))?;
    eprintln!("Settings template saved to {}", output.display());
    eprintln!("Edit it and pass --config {}", output.display());
    Ok(())
}

fn banner(rows: &[(&str, &str)]) {
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                  meltgen - MELT Data Generation              ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    for (label, value) in rows {
        eprintln!("║ {label:<10} {value:<49} ║");
    }
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
}

fn print_stats(stats: &GenerationStats) {
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                     Generation Complete                      ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║ Total records: {:45} ║", stats.total_records);
    eprintln!("║ Metrics: {:51} ║", stats.metrics_count);
    eprintln!("║ Logs: {:54} ║", stats.logs_count);
    eprintln!("║ Traces: {:52} ║", stats.traces_count);
    eprintln!("║ Events: {:52} ║", stats.events_count);
    eprintln!("║ Elapsed: {:49.2}s ║", stats.generation_time_seconds);
    eprintln!("║ Rate: {:46.0} rec/s ║", stats.records_per_second());
    eprintln!("║ Output size: {:44.2} MB ║", stats.output_size_mb);
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
}
