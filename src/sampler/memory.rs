//! memory.rs
//! Point-in-time memory estimates recorded alongside each jitter sample.
//!
//! Two sources:
//! - **Heap:** live bytes from the counting global allocator (`utils::alloc`).
//! - **Rss:** resident set size from `/proc/self/statm` (Linux only, 0 elsewhere).
//!
//! Both are coarse, racy snapshots; only aggregate trends matter.

use std::{fmt, str::FromStr};

use crate::utils::{alloc, error::ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemorySource {
    #[default]
    Heap,
    Rss,
}

impl MemorySource {
    pub fn name(&self) -> &'static str {
        match self {
            MemorySource::Heap => "heap",
            MemorySource::Rss => "rss",
        }
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemorySource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heap" => Ok(MemorySource::Heap),
            "rss" | "resident" => Ok(MemorySource::Rss),
            _ => Err(ConfigError::new("memory", s, "expected 'heap' or 'rss'")),
        }
    }
}

/// Memory in use right now, in kilobytes.
pub trait MemoryProbe {
    fn used_kilobytes(&self) -> i64;
}

impl MemoryProbe for MemorySource {
    fn used_kilobytes(&self) -> i64 {
        match self {
            MemorySource::Heap => (alloc::live_bytes() / 1024) as i64,
            MemorySource::Rss => resident_bytes().map_or(0, |b| (b / 1024) as i64),
        }
    }
}

/// Any `Fn() -> i64` works as a probe; handy for scripted tests.
impl<F> MemoryProbe for F
where
    F: Fn() -> i64,
{
    fn used_kilobytes(&self) -> i64 {
        self()
    }
}

#[cfg(target_os = "linux")]
fn resident_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // SAFETY: sysconf has no preconditions and only reads a configuration value.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(pages * page_size as u64)
}

#[cfg(not(target_os = "linux"))]
fn resident_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_names() {
        assert_eq!("heap".parse::<MemorySource>().unwrap(), MemorySource::Heap);
        assert_eq!("RSS".parse::<MemorySource>().unwrap(), MemorySource::Rss);
        assert!("swap".parse::<MemorySource>().is_err());
    }

    #[test]
    fn closure_probe() {
        let probe = || 512i64;
        assert_eq!(probe.used_kilobytes(), 512);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn resident_size_is_visible_on_linux() {
        assert!(MemorySource::Rss.used_kilobytes() > 0);
    }
}
