//! generator.rs
//! Background allocation churn: keeps the allocator busy while the sampler measures.
//!
//! Each iteration picks a random key in `[0, capacity)` and a random blob size in
//! `[0, max_entry_size)`. A vacant key gets a freshly allocated blob (growth), an occupied
//! key is removed (shrink). The mix of short- and long-lived blobs exercises both the
//! allocator fast path and its fragmentation path.
//!
//! Shutdown is cooperative: the loop polls a relaxed `AtomicBool` once per iteration and
//! acknowledges exit by sending its [`ChurnSummary`] on a rendezvous channel.

use crossbeam::channel::{Receiver, RecvTimeoutError, bounded};
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::churn::lru::LruCache;

pub const DEFAULT_CAPACITY: usize = 2_000_000;
pub const DEFAULT_MAX_ENTRY_SIZE: usize = 256;

/// Churn tunables. `capacity` and `max_entry_size` must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChurnConfig {
    pub capacity: usize,
    pub max_entry_size: usize,
    /// Fixed RNG seed for reproducible churn; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            seed: None,
        }
    }
}

/// What a single churn iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChurnOp {
    Insert { key: usize, size: usize },
    Remove { key: usize },
}

/// Counters reported by the generator when its loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChurnSummary {
    pub iterations: u64,
    pub inserts: u64,
    pub removes: u64,
    pub evictions: u64,
    pub final_len: usize,
}

pub struct ChurnGenerator<R: Rng> {
    cache: LruCache<usize, Box<[u8]>>,
    rng: R,
    max_entry_size: usize,
    iterations: u64,
    inserts: u64,
    removes: u64,
}

impl ChurnGenerator<StdRng> {
    pub fn from_config(config: &ChurnConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> ChurnGenerator<R> {
    pub fn with_rng(config: &ChurnConfig, rng: R) -> Self {
        Self {
            cache: LruCache::new(config.capacity),
            rng,
            max_entry_size: config.max_entry_size,
            iterations: 0,
            inserts: 0,
            removes: 0,
        }
    }

    /// One churn iteration: fill a vacant key or free an occupied one.
    pub fn step(&mut self) -> ChurnOp {
        let key = self.rng.random_range(0..self.cache.capacity());
        let size = self.rng.random_range(0..self.max_entry_size);
        self.iterations += 1;

        if self.cache.get(&key).is_none() {
            self.cache.put(key, vec![0u8; size].into_boxed_slice());
            self.inserts += 1;
            ChurnOp::Insert { key, size }
        } else {
            self.cache.remove(&key);
            self.removes += 1;
            ChurnOp::Remove { key }
        }
    }

    /// Churns until `stop` is observed. An iteration in flight always completes.
    pub fn run(&mut self, stop: &AtomicBool) -> ChurnSummary {
        while !stop.load(Ordering::Relaxed) {
            self.step();
        }
        self.summary()
    }

    /// Bounded variant of [`run`](Self::run), used by tests and benches.
    pub fn run_for(&mut self, iterations: u64) -> ChurnSummary {
        for _ in 0..iterations {
            self.step();
        }
        self.summary()
    }

    pub fn cache(&self) -> &LruCache<usize, Box<[u8]>> {
        &self.cache
    }

    pub fn summary(&self) -> ChurnSummary {
        ChurnSummary {
            iterations: self.iterations,
            inserts: self.inserts,
            removes: self.removes,
            evictions: self.cache.evictions(),
            final_len: self.cache.len(),
        }
    }
}

/// How the generator's shutdown wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChurnShutdown {
    Stopped(ChurnSummary),
    /// No acknowledgement within the limit; the thread is left detached.
    TimedOut(Duration),
    Panicked,
}

/// Running generator thread plus its stop flag and exit acknowledgement.
pub struct ChurnHandle {
    handle: JoinHandle<()>,
    done: Receiver<ChurnSummary>,
    stop: Arc<AtomicBool>,
}

impl ChurnHandle {
    /// Raises the stop flag. Returns immediately.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Blocks until the loop acknowledges the stop signal.
    ///
    /// With `timeout = None` the wait is unbounded: a generator that never observes
    /// the flag stalls the caller forever.
    pub fn wait(self, timeout: Option<Duration>) -> ChurnShutdown {
        let ack = match timeout {
            None => self.done.recv().ok(),
            Some(limit) => match self.done.recv_timeout(limit) {
                Ok(summary) => Some(summary),
                Err(RecvTimeoutError::Timeout) => return ChurnShutdown::TimedOut(limit),
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };

        let joined = self.handle.join();
        match (ack, joined) {
            (Some(summary), Ok(())) => ChurnShutdown::Stopped(summary),
            _ => ChurnShutdown::Panicked,
        }
    }
}

/// Spawns the churn actor at normal priority.
pub fn spawn_churn(config: ChurnConfig) -> io::Result<ChurnHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let (tx_done, rx_done) = bounded::<ChurnSummary>(1);
    let flag = stop.clone();

    let handle = thread::Builder::new()
        .name("churn-generator".to_string())
        .spawn(move || {
            info!(
                "[Churn] started: capacity={} max_entry_size={}",
                config.capacity, config.max_entry_size
            );
            let mut generator = ChurnGenerator::from_config(&config);
            let summary = generator.run(&flag);
            debug!("[Churn] loop exited after {} iterations", summary.iterations);
            let _ = tx_done.send(summary);
            // cache teardown happens here, after the acknowledgement
        })?;

    Ok(ChurnHandle {
        handle,
        done: rx_done,
        stop,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
