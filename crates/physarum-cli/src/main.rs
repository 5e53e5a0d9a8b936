use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use physarum_core::config::{Backend, SimConfig};
use physarum_core::Engine;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 200;
const BENCHMARK_SEED: u64 = 42;

#[derive(Parser)]
#[command(name = "physarum")]
#[command(about = "Physarum trail simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless simulation and report sampled metrics
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// RNG seed (drawn at random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Collect metrics every N steps
        #[arg(long, default_value_t = 100)]
        sample_every: usize,

        /// Output directory for summary.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare sequential and parallel backends
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path).with_context(|| format!("failed to open config file {path:?}"))?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn run_benchmark(initial_agents: usize, backend: Backend) -> Result<()> {
    let config = SimConfig {
        initial_agents,
        initial_radius: 100,
        spawn_rate: 0,
        backend,
        ..SimConfig::default()
    };
    let mut engine =
        Engine::new(config, Some(BENCHMARK_SEED)).context("benchmark config validation error")?;

    for _ in 0..WARMUP_STEPS {
        engine.step();
    }

    let mut total_spawn = 0u64;
    let mut total_agents = 0u64;
    let mut total_field = 0u64;
    let mut total_time = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = engine.step();
        total_spawn += timings.spawn_us;
        total_agents += timings.agent_pass_us;
        total_field += timings.field_update_us;
        total_time += timings.total_us;
    }

    let steps = BENCHMARK_STEPS as f64;
    let avg_step_us = total_time as f64 / steps;
    let steps_per_sec = 1_000_000.0 / avg_step_us.max(1.0);
    println!("--- {initial_agents} agents, {backend:?} ---");
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     spawn={:.0} us, agents={:.0} us, field={:.0} us",
        total_spawn as f64 / steps,
        total_agents as f64 / steps,
        total_field as f64 / steps,
    );
    println!(
        "  Corner resets: {} over {} steps",
        engine.total_corner_resets(),
        engine.step_index()
    );
    println!();
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p physarum-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Physarum step benchmark ===");
            println!("Warmup: {WARMUP_STEPS} steps, Benchmark: {BENCHMARK_STEPS} steps");
            println!();
            for agents in [10_000, 100_000, 1_000_000] {
                for backend in [Backend::Sequential, Backend::Parallel] {
                    run_benchmark(agents, backend)?;
                }
            }
        }
        Commands::Run {
            config,
            seed,
            steps,
            sample_every,
            out,
        } => {
            let sim_config = load_config(config.as_ref())?;
            let mut engine =
                Engine::new(sim_config, seed).context("failed to initialize engine")?;
            info!(
                seed = engine.seed(),
                steps,
                sample_every,
                agents = engine.agent_count(),
                "starting run"
            );

            let summary = engine
                .run_experiment(steps, sample_every)
                .context("invalid run parameters")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                println!(
                    "Run complete. Final agents: {}, corner resets: {}, seed: {}",
                    summary.final_agent_count, summary.total_corner_resets, summary.seed
                );
            }
        }
    }
    Ok(())
}
