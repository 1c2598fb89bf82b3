use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use infection_core::config::{InitialConditions, SimConfig};
use infection_core::splitting::SplittingScheme;
use infection_core::world::World;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 200;
const TARGET_SPS: f64 = 100.0;

#[derive(Parser)]
#[command(name = "infection-sim")]
#[command(about = "Spatial viral infection simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a config file
    Run {
        /// Path to config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for results (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of ticks to run
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Record metrics every N ticks
        #[arg(long, default_value_t = 10)]
        sample_every: usize,

        /// Ticks at which to capture full state snapshots
        #[arg(long, value_delimiter = ',')]
        snapshot_at: Vec<usize>,
    },
    /// Run the performance benchmark suite
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn run_benchmark(side: usize, scheme: SplittingScheme, parallel_cells: bool) -> Result<()> {
    let mut config = SimConfig {
        grid_width: side,
        grid_height: side,
        parallel_cells,
        initial: InitialConditions {
            infected_cells: side,
            virus_concentration: 1e-3,
            ..InitialConditions::default()
        },
        ..SimConfig::default()
    };
    config.splitting.scheme = scheme;

    let mut world = World::try_new(config).context("benchmark world initialization failed")?;

    for _ in 0..WARMUP_STEPS {
        world.step().context("warmup step failed")?;
    }

    let mut total_cell = 0u64;
    let mut total_field = 0u64;
    let mut total_time = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step().context("benchmark step failed")?;
        total_cell += timings.cell_phase_us;
        total_field += timings.field_phase_us;
        total_time += timings.total_us;
    }

    let avg_step_us = (total_time as f64 / BENCHMARK_STEPS as f64).max(1.0);
    let steps_per_sec = 1_000_000.0 / avg_step_us;

    println!(
        "--- {side}x{side} grid ({} sites), {scheme:?}, parallel={parallel_cells} ---",
        side * side
    );
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     cells={:.0} us, field={:.0} us",
        total_cell as f64 / BENCHMARK_STEPS as f64,
        total_field as f64 / BENCHMARK_STEPS as f64,
    );
    let verdict = if steps_per_sec >= TARGET_SPS {
        "GO"
    } else {
        "NO-GO"
    };
    println!("  Verdict:       {verdict} (target: >={TARGET_SPS} steps/sec)");
    let counts = world.counts();
    println!(
        "  Population:    target={}, infected={}, dead={}",
        counts.target, counts.infected, counts.dead
    );
    println!();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p infection-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Infection Simulation Benchmark ===");
            println!("Warmup: {WARMUP_STEPS} steps, Benchmark: {BENCHMARK_STEPS} steps");
            println!("Target: >={TARGET_SPS} steps/sec for a 256x256 grid");
            println!();

            for scheme in [SplittingScheme::Lie, SplittingScheme::Strang] {
                for side in [64, 128, 256] {
                    run_benchmark(side, scheme, true)?;
                }
            }
            run_benchmark(256, SplittingScheme::Lie, false)?;
        }
        Commands::Run {
            config,
            out,
            steps,
            sample_every,
            snapshot_at,
        } => {
            let file = File::open(&config).context("failed to open config file")?;
            let reader = BufReader::new(file);
            let sim_config: SimConfig =
                serde_json::from_reader(reader).context("failed to parse config")?;

            log::info!("loaded config from {}", config.display());
            println!("Simulating for {} steps...", steps);

            let mut world = World::try_new(sim_config).context("config validation error")?;
            let summary = world
                .try_run_experiment_with_snapshots(steps, sample_every, &snapshot_at)
                .context("simulation failed")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                let counts = summary.final_counts;
                println!(
                    "Run complete. target={}, infected={}, dead={}, total infections={}, total deaths={}",
                    counts.target,
                    counts.infected,
                    counts.dead,
                    summary.total_infections,
                    summary.total_deaths
                );
            }
        }
    }
    Ok(())
}
