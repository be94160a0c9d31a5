//! jitter.rs
//! Measures sleep overshoot ("delay") while the churn generator loads the allocator.
//!
//! - Each round: monotonic start → pause(requested) → monotonic stop → delay = elapsed - requested.
//! - Samples land in a pre-allocated series; nothing is allocated inside the measured window.
//! - Delay is kept signed: an early wake-up is recorded as a negative value, never clamped.
//! - An interrupted pause aborts the whole run; no partial series is returned.
//!
//! The sampler thread is spawned at `ThreadPriority::Max` (falls back to normal priority with a
//! warning when the OS refuses) and may be pinned to a core.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    io,
    thread::{self, JoinHandle},
    time::Duration,
};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

use crate::sampler::{
    memory::{MemoryProbe, MemorySource},
    timer::{PauseStrategy, SystemTimer, Timer},
};
use crate::utils::{clock::epoch_millis, error::SampleError};

pub const DEFAULT_PAUSE_MS: u64 = 100;
pub const DEFAULT_SAMPLES: usize = 300;

const NANOS_PER_MICRO: i64 = 1_000;

/// One measured round. Field order is the on-disk column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_millis: i64,
    pub memory_kilobytes: i64,
    pub delay_micros: i64,
}

/// Fixed-capacity series with a monotonically advancing cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSeries {
    slots: Vec<Sample>,
    cursor: usize,
}

impl SampleSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Sample::default(); capacity],
            cursor: 0,
        }
    }

    /// Zeroes every slot and rewinds the cursor.
    pub fn reset(&mut self) {
        self.slots.fill(Sample::default());
        self.cursor = 0;
    }

    /// Appends at the cursor. Returns `false` when the series is already full.
    #[inline]
    pub fn push(&mut self, sample: Sample) -> bool {
        match self.slots.get_mut(self.cursor) {
            Some(slot) => {
                *slot = sample;
                self.cursor += 1;
                true
            }
            None => false,
        }
    }

    /// Number of recorded samples (the cursor).
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Recorded samples in recording order.
    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.slots[..self.cursor]
    }

    pub fn into_samples(mut self) -> Vec<Sample> {
        self.slots.truncate(self.cursor);
        self.slots
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Requested pause per round (millisecond granularity).
    pub pause: Duration,
    pub samples: usize,
    pub strategy: PauseStrategy,
    pub memory: MemorySource,
    /// Core to pin the sampler thread to, if any.
    pub core: Option<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(DEFAULT_PAUSE_MS),
            samples: DEFAULT_SAMPLES,
            strategy: PauseStrategy::Os,
            memory: MemorySource::Heap,
            core: None,
        }
    }
}

pub struct JitterSampler<T: Timer, M: MemoryProbe> {
    pause: Duration,
    rounds: usize,
    timer: T,
    probe: M,
    series: SampleSeries,
    state: SamplerState,
}

impl<T: Timer, M: MemoryProbe> JitterSampler<T, M> {
    pub fn new(config: &SamplerConfig, timer: T, probe: M) -> Self {
        Self {
            pause: config.pause,
            rounds: config.samples,
            timer,
            probe,
            series: SampleSeries::with_capacity(config.samples),
            state: SamplerState::Idle,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn into_series(self) -> SampleSeries {
        self.series
    }

    /// Runs every round to completion, or aborts on the first interrupted pause.
    pub fn run(&mut self) -> Result<&SampleSeries, SampleError> {
        self.state = SamplerState::Running;
        self.series.reset();

        let requested_ns = self.pause.as_nanos() as i64;

        for round in 0..self.rounds {
            // ====================================================================
            // Measured window: clock → pause → clock, nothing else
            // ====================================================================
            let start = self.timer.now_ns();
            if self.timer.pause(self.pause).is_err() {
                self.state = SamplerState::Aborted;
                error!("[Sampler] pause interrupted in round {}; aborting run", round);
                return Err(SampleError::Interrupted { round });
            }
            let stop = self.timer.now_ns();

            let elapsed_ns = stop as i64 - start as i64;
            let delay_micros = (elapsed_ns - requested_ns) / NANOS_PER_MICRO;

            self.series.push(Sample {
                timestamp_millis: epoch_millis(),
                memory_kilobytes: self.probe.used_kilobytes(),
                delay_micros,
            });
            debug!("[Sampler] round {} delay={}us", round, delay_micros);
        }

        self.state = SamplerState::Finished;
        Ok(&self.series)
    }
}

/// Spawns the sampler on its own thread at the highest priority the OS grants.
///
/// The thread owns its series; the caller gets it back through `join()`.
pub fn spawn_sampler(
    config: SamplerConfig,
) -> io::Result<JoinHandle<Result<SampleSeries, SampleError>>> {
    thread::Builder::new()
        .name("jitter-sampler".to_string())
        .spawn_with_priority(ThreadPriority::Max, move |priority| {
            if let Err(e) = priority {
                warn!("[Sampler] could not raise priority, running at default: {:?}", e);
            }

            if let Some(core) = config.core {
                pin_to_core(core);
            }

            info!(
                "[Sampler] started: samples={} pause={:?} strategy={} memory={}",
                config.samples, config.pause, config.strategy, config.memory
            );

            let mut sampler =
                JitterSampler::new(&config, SystemTimer::new(config.strategy), config.memory);
            sampler.run()?;
            info!("[Sampler] finished {} rounds", sampler.series().len());
            Ok(sampler.into_series())
        })
}

fn pin_to_core(core: usize) {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    match core_ids.get(core) {
        Some(core_id) => {
            if core_affinity::set_for_current(*core_id) {
                info!("[Sampler] pinned to core {}", core);
            } else {
                warn!("[Sampler] failed to pin to core {}", core);
            }
        }
        None => warn!("[Sampler] core {} not among available cores", core),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
