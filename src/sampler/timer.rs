//! timer.rs
//! Monotonic clock + pause primitive used by the jitter sampler.
//!
//! - `PauseStrategy::Os`: plain `thread::sleep`, i.e. whatever the scheduler grants.
//! - `PauseStrategy::Spin`: `SpinSleeper` hybrid (sleep most of the interval, spin the tail),
//!   the same pacing used by the periodic sensor loops this crate grew out of.
//!
//! The [`Timer`] trait is the seam that lets tests drive the sampler with a scripted clock.

use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    fmt,
    str::FromStr,
    thread,
    time::{Duration, Instant},
};

use crate::utils::error::ConfigError;

/// Native accuracy handed to `SpinSleeper` (100 µs).
const SPIN_NATIVE_ACCURACY_NS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseStrategy {
    #[default]
    Os,
    Spin,
}

impl PauseStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            PauseStrategy::Os => "os",
            PauseStrategy::Spin => "spin",
        }
    }
}

impl fmt::Display for PauseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PauseStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "os" | "sleep" => Ok(PauseStrategy::Os),
            "spin" => Ok(PauseStrategy::Spin),
            _ => Err(ConfigError::new("pause", s, "expected 'os' or 'spin'")),
        }
    }
}

/// The pause was cut short before its interval elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Monotonic time source plus a blocking pause.
pub trait Timer {
    /// Nanoseconds on a monotonic clock with an arbitrary origin.
    fn now_ns(&self) -> u64;

    /// Blocks for at least `period` unless interrupted.
    fn pause(&mut self, period: Duration) -> Result<(), Interrupted>;
}

/// Real clock: `Instant` for timestamps, OS or spin sleep for pauses.
pub struct SystemTimer {
    origin: Instant,
    strategy: PauseStrategy,
    sleeper: SpinSleeper,
}

impl SystemTimer {
    pub fn new(strategy: PauseStrategy) -> Self {
        Self {
            origin: Instant::now(),
            strategy,
            sleeper: SpinSleeper::new(SPIN_NATIVE_ACCURACY_NS)
                .with_spin_strategy(SpinStrategy::YieldThread),
        }
    }

    pub fn strategy(&self) -> PauseStrategy {
        self.strategy
    }
}

impl Timer for SystemTimer {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn pause(&mut self, period: Duration) -> Result<(), Interrupted> {
        // neither primitive can be interrupted; early wake-ups surface as negative delay
        match self.strategy {
            PauseStrategy::Os => thread::sleep(period),
            PauseStrategy::Spin => self.sleeper.sleep(period),
        }
        Ok(())
    }
}
