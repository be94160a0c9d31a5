//! # churn_jitter
//!
//! Measures scheduling jitter caused by allocator pressure.
//!
//! A churn generator hammers a bounded LRU cache with random-sized blobs while a separate,
//! high-priority sampler repeatedly sleeps for a fixed interval and records how much longer
//! than requested each sleep took. After both actors stop, the run is summarised
//! (max/min/mean/std-dev delay, memory high/low water) and persisted as a CSV record.
//!
//! ## Layout
//! - [`churn`]: bounded LRU cache and the churn generator thread.
//! - [`sampler`]: timer/memory seams and the jitter sampler thread.
//! - [`utils`]: configuration, errors, statistics, record encode/decode.
//! - [`run`]: the driver tying the actors together.

pub mod churn;
pub mod run;
pub mod sampler;
pub mod utils;
