// Shared plumbing: configuration, errors, clocks, the allocator ledger,
// run statistics and the persisted record format.

pub mod alloc;
pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod stats;
