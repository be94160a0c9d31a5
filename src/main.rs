//! # Churn Jitter Entry Point
//!
//! Runs one jitter-under-allocation-pressure benchmark and writes the record.
//!
//! ## Threads
//! - **churn-generator:** normal priority, random insert/remove of blobs in a bounded LRU cache.
//! - **jitter-sampler:** max priority, fixed number of sleep rounds, records overshoot per round.
//! - **main:** waits for the sampler, stops the generator, summarises, writes the CSV.
//!
//! ## Exit status
//! - `0` run completed and record written.
//! - `2` bad option value (clap usage errors share this code).
//! - `3` record could not be written, or a thread could not be spawned.
//! - `4` a sampler pause was interrupted.
//! - `5` an actor panicked.

use clap::Parser;
use log::{error, info};
use std::{path::PathBuf, process::ExitCode, time::Duration};

use churn_jitter::{
    churn::generator::{ChurnConfig, DEFAULT_CAPACITY, DEFAULT_MAX_ENTRY_SIZE},
    run::{print_summary, run_benchmark},
    sampler::{
        jitter::{DEFAULT_PAUSE_MS, DEFAULT_SAMPLES, SamplerConfig},
        memory::MemorySource,
        timer::PauseStrategy,
    },
    utils::{
        alloc::CountingAllocator,
        config::{DEFAULT_LABEL, DEFAULT_OUTPUT, RunConfig},
        error::JitterError,
    },
};

// Every allocation in the process feeds the live-heap ledger the sampler reads.
#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

#[derive(Parser, Debug)]
#[command(
    name = "churn_jitter",
    version,
    about = "Measure sleep jitter while a background thread churns the allocator"
)]
struct Cli {
    /// Churn cache capacity (entries)
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Upper bound (exclusive) on churn blob size in bytes
    #[arg(long = "maxsize", default_value_t = DEFAULT_MAX_ENTRY_SIZE)]
    max_entry_size: usize,

    /// Sampler pause per round in milliseconds
    #[arg(long = "sleep", default_value_t = DEFAULT_PAUSE_MS)]
    sleep_ms: u64,

    /// Number of sampler rounds
    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    samples: usize,

    /// Record output file
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Test label written into the record
    #[arg(long, default_value = DEFAULT_LABEL)]
    label: String,

    /// Pause primitive: os | spin
    #[arg(long, default_value_t = PauseStrategy::Os)]
    pause: PauseStrategy,

    /// Memory estimate per sample: heap | rss
    #[arg(long, default_value_t = MemorySource::Heap)]
    memory: MemorySource,

    /// Pin the sampler thread to this core
    #[arg(long)]
    core: Option<usize>,

    /// Seed for the churn generator's RNG
    #[arg(long)]
    seed: Option<u64>,

    /// Give up waiting for the churn generator after this many milliseconds
    #[arg(long = "shutdown-timeout-ms")]
    shutdown_timeout_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            churn: ChurnConfig {
                capacity: self.capacity,
                max_entry_size: self.max_entry_size,
                seed: self.seed,
            },
            sampler: SamplerConfig {
                pause: Duration::from_millis(self.sleep_ms),
                samples: self.samples,
                strategy: self.pause,
                memory: self.memory,
                core: self.core,
            },
            output: self.output,
            label: self.label,
            shutdown_timeout: self.shutdown_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().into_config();

    println!(
        "Starting churn jitter run: samples={} sleep={} ms",
        config.sampler.samples,
        config.sampler.pause.as_millis()
    );

    match execute(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn execute(config: &RunConfig) -> Result<(), JitterError> {
    let outcome = run_benchmark(config)?;
    print_summary(&outcome, config);

    println!("Generating {}...", config.output.display());
    outcome.record.save(&config.output)?;
    info!("[Main] record written to {}", config.output.display());
    Ok(())
}
