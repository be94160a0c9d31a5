// Sampler: the timing actor.
// Repeatedly requests a fixed pause, measures the overshoot and records it with a memory estimate.

pub mod timer;
pub mod memory;
pub mod jitter;
