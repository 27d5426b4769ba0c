//! meltgen-bench - generation throughput benchmark
//!
//! Usage:
//!   meltgen-bench --sizes 100MB,1GB --iterations 3 -o benchmark_results.json

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use meltgen_bench::{BenchmarkConfig, BenchmarkRunner};

#[derive(Parser)]
#[command(name = "meltgen-bench")]
#[command(version)]
#[command(about = "Benchmark meltgen generation across data sizes")]
struct Cli {
    /// Comma-separated list of sizes to benchmark
    #[arg(long, default_value = "100MB,1GB,5GB")]
    sizes: String,

    /// Iterations per size
    #[arg(long, default_value_t = 3)]
    iterations: u32,

    /// Random seed used for every run
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output file for benchmark results
    #[arg(short, long, default_value = "./benchmark_results.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = BenchmarkConfig {
        sizes: cli
            .sizes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        iterations: cli.iterations.max(1),
        seed: cli.seed,
    };

    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║                meltgen Generation Benchmark                  ║");
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    eprintln!("║ Sizes: {:53} ║", cli.sizes);
    eprintln!("║ Iterations: {:48} ║", config.iterations);
    eprintln!("╚══════════════════════════════════════════════════════════════╝");

    let results = BenchmarkRunner::new(config).run()?;

    std::fs::write(&cli.output, serde_json::to_string_pretty(&results)?)
        .with_context(|| format!("cannot write {}", cli.output.display()))?;

    eprintln!("\nBenchmark results:");
    for (size, summary) in &results {
        eprintln!("  {size}:");
        eprintln!(
            "    avg time:   {:.2}s (min {:.2}s, max {:.2}s)",
            summary.generation_time_seconds.avg,
            summary.generation_time_seconds.min,
            summary.generation_time_seconds.max
        );
        eprintln!(
            "    avg rate:   {:.0} records/sec",
            summary.records_per_second.avg
        );
        eprintln!(
            "    avg memory: {:.1} MB",
            summary.memory_delta_mb.avg
        );
    }
    eprintln!("Detailed results saved to {}", cli.output.display());
    Ok(())
}
