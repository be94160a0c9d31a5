//! Run configuration: every tunable in one struct, handed to each actor by value.
//!
//! Defaults mirror the classic gcstress run: 2,000,000-entry churn cache, blobs under
//! 256 bytes, 100 ms pauses, 300 samples, output `gcstress.csv`.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::churn::generator::ChurnConfig;
use crate::sampler::jitter::SamplerConfig;
use crate::utils::error::ConfigError;

pub const DEFAULT_OUTPUT: &str = "gcstress.csv";
pub const DEFAULT_LABEL: &str = "GC Stress";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub churn: ChurnConfig,
    pub sampler: SamplerConfig,
    pub output: PathBuf,
    /// Written as the record's `Test=` value.
    pub label: String,
    /// Upper bound on the wait for the churn generator to stop; `None` waits forever.
    pub shutdown_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            churn: ChurnConfig::default(),
            sampler: SamplerConfig::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            label: DEFAULT_LABEL.to_string(),
            shutdown_timeout: None,
        }
    }
}

impl RunConfig {
    /// Rejects values that would make the run meaningless or crash an actor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.churn.capacity == 0 {
            return Err(ConfigError::new("capacity", 0, "must be at least 1"));
        }
        if self.churn.max_entry_size == 0 {
            return Err(ConfigError::new("maxsize", 0, "must be at least 1"));
        }
        if self.sampler.samples == 0 {
            return Err(ConfigError::new("samples", 0, "must be at least 1"));
        }
        if self.sampler.pause.is_zero() {
            return Err(ConfigError::new("sleep", 0, "must be at least 1 ms"));
        }
        if self.label.contains(['\n', '\r']) {
            return Err(ConfigError::new(
                "label",
                self.label.escape_debug(),
                "must be a single line",
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::new("output", "", "path is empty"));
        }
        if self.output.is_dir() {
            return Err(ConfigError::new(
                "output",
                self.output.display(),
                "is a directory",
            ));
        }
        let parent = match self.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(ConfigError::new(
                "output",
                self.output.display(),
                format!("directory {} does not exist", parent.display()),
            ));
        }
        Ok(())
    }
}
