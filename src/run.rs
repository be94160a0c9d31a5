//! run.rs
//! Orchestrates one benchmark run: churn first, then the sampler, then the summary.
//!
//! ## Sequence
//! 1. Spawn the churn generator (normal priority) so pressure exists before sampling.
//! 2. Spawn the sampler (max priority) and block until it finishes its rounds.
//! 3. Raise the churn stop flag and block until the generator acknowledges.
//! 4. Compute statistics and assemble the record. No file I/O happens before this point.
//!
//! The two actors share nothing but the stop flag; the churn cache and the sample series
//! each live on exactly one thread.

use log::{error, info, warn};
use std::env::consts::{ARCH, OS};

use crate::churn::generator::{ChurnShutdown, ChurnSummary, spawn_churn};
use crate::sampler::{jitter::spawn_sampler, memory::MemorySource};
use crate::utils::{
    alloc::counting_installed,
    clock::utc_timestamp,
    config::RunConfig,
    error::JitterError,
    record::RunRecord,
    stats::RunStatistics,
};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub statistics: RunStatistics,
    /// `None` when the generator did not acknowledge within the shutdown timeout.
    pub churn: Option<ChurnSummary>,
}

/// Identity string written as the record's `VM=` value.
pub fn runtime_identity(memory: MemorySource) -> String {
    format!(
        "{} {} ({}-{}, {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        ARCH,
        OS,
        memory
    )
}

pub fn run_benchmark(config: &RunConfig) -> Result<RunOutcome, JitterError> {
    config.validate()?;

    info!(
        "[Run] starting: samples={} sleep={:?} capacity={} maxsize={}",
        config.sampler.samples, config.sampler.pause, config.churn.capacity, config.churn.max_entry_size
    );
    if config.sampler.memory == MemorySource::Heap && !counting_installed() {
        warn!("[Run] counting allocator not installed; heap figures will read 0 KB");
    }

    // ========================================================================
    // Actors
    // ========================================================================
    let churn = spawn_churn(config.churn).map_err(|source| JitterError::Spawn {
        actor: "churn generator",
        source,
    })?;

    let sampler = match spawn_sampler(config.sampler) {
        Ok(handle) => handle,
        Err(source) => {
            churn.signal_stop();
            let _ = churn.wait(config.shutdown_timeout);
            return Err(JitterError::Spawn {
                actor: "jitter sampler",
                source,
            });
        }
    };

    let sampled = sampler.join();

    info!("[Run] sampler done, stopping churn generator");
    churn.signal_stop();
    let churn_summary = match churn.wait(config.shutdown_timeout) {
        ChurnShutdown::Stopped(summary) => {
            info!(
                "[Run] churn stopped: iterations={} inserts={} removes={} live_entries={}",
                summary.iterations, summary.inserts, summary.removes, summary.final_len
            );
            Some(summary)
        }
        ChurnShutdown::TimedOut(limit) => {
            error!(
                "[Run] churn generator did not stop within {:?}; leaving it detached",
                limit
            );
            None
        }
        ChurnShutdown::Panicked => {
            warn!("[Run] churn generator panicked; sampling was unaffected");
            None
        }
    };

    let series = sampled.map_err(|_| JitterError::WorkerPanicked {
        actor: "jitter sampler",
    })??;

    // ========================================================================
    // Summary (both actors stopped)
    // ========================================================================
    let statistics = RunStatistics::compute(series.as_slice()).ok_or(JitterError::NoSamples)?;
    let record = RunRecord::new(
        config.label.as_str(),
        runtime_identity(config.sampler.memory),
        utc_timestamp(),
        &statistics,
        series.into_samples(),
    );

    Ok(RunOutcome {
        record,
        statistics,
        churn: churn_summary,
    })
}

/// Console report printed after a run.
pub fn print_summary(outcome: &RunOutcome, config: &RunConfig) {
    let m = &outcome.record.metadata;
    let s = &outcome.statistics;
    println!("Runtime:    {}", m.vm);
    println!("OS:         {} {}", OS, ARCH);
    println!("Samples:    {}", s.count);
    println!("Max memory: {:.1} KBytes", s.max_memory);
    println!("Min memory: {:.1} KBytes", s.min_memory);
    println!("Sleep time: {:.6} seconds", config.sampler.pause.as_secs_f64());
    println!("Max delay:  {:.6} seconds", s.max_delay);
    println!("Min delay:  {:.6} seconds", s.min_delay);
    println!("Avg delay:  {:.6} seconds", s.mean_delay);
    println!("Std Dev:    {:.6} seconds", s.std_dev_delay);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::churn::generator::ChurnConfig;
    use crate::sampler::jitter::SamplerConfig;
    use std::time::Duration;

    fn quick_config() -> RunConfig {
        RunConfig {
            churn: ChurnConfig {
                capacity: 2_000,
                max_entry_size: 64,
                seed: Some(3),
            },
            sampler: SamplerConfig {
                pause: Duration::from_millis(2),
                samples: 6,
                ..SamplerConfig::default()
            },
            label: "unit".to_string(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn identity_names_crate_and_source() {
        let id = runtime_identity(MemorySource::Rss);
        assert!(id.starts_with("churn_jitter "));
        assert!(id.ends_with(", rss)"));
    }

    #[test]
    fn short_run_collects_every_sample() {
        let outcome = run_benchmark(&quick_config()).unwrap();
        assert_eq!(outcome.record.samples.len(), 6);
        assert_eq!(outcome.record.metadata.samples, 6);
        assert_eq!(outcome.record.metadata.label, "unit");
        assert!(outcome.statistics.max_delay >= outcome.statistics.mean_delay);
        assert!(outcome.statistics.mean_delay >= outcome.statistics.min_delay);
        let churn = outcome.churn.unwrap();
        assert!(churn.final_len <= 2_000);
    }

    #[test]
    fn invalid_config_fails_before_spawning() {
        let mut config = quick_config();
        config.sampler.samples = 0;
        let err = run_benchmark(&config).unwrap_err();
        assert!(matches!(err, JitterError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
