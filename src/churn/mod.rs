// Churn: manufactures allocator pressure for the duration of a run.
// Owns the bounded LRU cache and the background generator thread that mutates it.

pub mod lru;
pub mod generator;
