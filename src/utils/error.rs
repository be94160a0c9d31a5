//! Error taxonomy for a benchmark run.
//!
//! - [`ConfigError`]: a tunable parameter has an unusable value. Never retried.
//! - [`SampleError`]: the sampler's pause was interrupted; the run is void.
//! - [`RecordError`]: the persisted record could not be written or parsed.
//! - [`JitterError`]: top-level aggregate carried back to `main`, which maps it to an exit status.

use std::{fmt, io};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_IO: u8 = 3;
pub const EXIT_INTERRUPTED: u8 = 4;
pub const EXIT_WORKER: u8 = 5;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Invalid option value, carrying the option name and the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    option: &'static str,
    value: String,
    reason: String,
}

impl ConfigError {
    pub fn new(option: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            option,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn option(&self) -> &'static str {
        self.option
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad {} '{}': {}", self.option, self.value, self.reason)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// SampleError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// The pause for `round` returned before its interval elapsed.
    Interrupted { round: usize },
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Interrupted { round } => write!(
                f,
                "pause interrupted during round {}; timing for the run is invalid",
                round
            ),
        }
    }
}

impl std::error::Error for SampleError {}

// ---------------------------------------------------------------------------
// RecordError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RecordError {
    Io(io::Error),
    Csv(csv::Error),
    /// Line does not match the metadata, header or data shape.
    Malformed { line: u64, reason: String },
    MissingField(&'static str),
    DuplicateField { line: u64, key: String },
    SampleCountMismatch { declared: usize, found: usize },
    /// A metadata value cannot be written as a single record line.
    InvalidValue { key: &'static str, reason: String },
}

impl RecordError {
    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        RecordError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Io(e) => write!(f, "record I/O failed: {}", e),
            RecordError::Csv(e) => write!(f, "record encoding failed: {}", e),
            RecordError::Malformed { line, reason } => {
                write!(f, "malformed record line {}: {}", line, reason)
            }
            RecordError::MissingField(key) => write!(f, "record is missing field '{}'", key),
            RecordError::DuplicateField { line, key } => {
                write!(f, "record line {} repeats field '{}'", line, key)
            }
            RecordError::SampleCountMismatch { declared, found } => write!(
                f,
                "record declares {} samples but carries {} rows",
                declared, found
            ),
            RecordError::InvalidValue { key, reason } => {
                write!(f, "cannot write field '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Io(e) => Some(e),
            RecordError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        RecordError::Io(e)
    }
}

impl From<csv::Error> for RecordError {
    fn from(e: csv::Error) -> Self {
        RecordError::Csv(e)
    }
}

// ---------------------------------------------------------------------------
// JitterError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum JitterError {
    Config(ConfigError),
    Sample(SampleError),
    Record(RecordError),
    Spawn { actor: &'static str, source: io::Error },
    WorkerPanicked { actor: &'static str },
    NoSamples,
}

impl JitterError {
    /// Process exit status for this failure; every kind is non-zero.
    pub fn exit_code(&self) -> u8 {
        match self {
            JitterError::Config(_) => EXIT_CONFIG,
            JitterError::Record(_) | JitterError::Spawn { .. } => EXIT_IO,
            JitterError::Sample(_) => EXIT_INTERRUPTED,
            JitterError::WorkerPanicked { .. } | JitterError::NoSamples => EXIT_WORKER,
        }
    }
}

impl fmt::Display for JitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitterError::Config(e) => write!(f, "configuration error: {}", e),
            JitterError::Sample(e) => write!(f, "sampling aborted: {}", e),
            JitterError::Record(e) => e.fmt(f),
            JitterError::Spawn { actor, source } => {
                write!(f, "failed to spawn {} thread: {}", actor, source)
            }
            JitterError::WorkerPanicked { actor } => write!(f, "{} thread panicked", actor),
            JitterError::NoSamples => f.write_str("run finished without any samples"),
        }
    }
}

impl std::error::Error for JitterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JitterError::Config(e) => Some(e),
            JitterError::Sample(e) => Some(e),
            JitterError::Record(e) => Some(e),
            JitterError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for JitterError {
    fn from(e: ConfigError) -> Self {
        JitterError::Config(e)
    }
}

impl From<SampleError> for JitterError {
    fn from(e: SampleError) -> Self {
        JitterError::Sample(e)
    }
}

impl From<RecordError> for JitterError {
    fn from(e: RecordError) -> Self {
        JitterError::Record(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
