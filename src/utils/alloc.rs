//! Live-heap ledger backed by a counting global allocator.
//!
//! The binary installs [`CountingAllocator`] as its `#[global_allocator]`; every allocation
//! and deallocation then adjusts two process-wide byte counters. `live_bytes()` is the
//! difference, the closest analogue Rust offers to "heap total minus heap free".
//!
//! Counters are read with relaxed ordering and may be mutually inconsistent for an
//! instant under concurrent churn. Samples only need coarse accuracy.
//!
//! Library users that do not install the allocator see zero live bytes;
//! [`counting_installed`] tells the two cases apart.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    sync::atomic::{AtomicU64, Ordering},
};

/// Cache-line padded counter; alloc and dealloc traffic hit different lines.
#[repr(align(64))]
struct PaddedCounter(AtomicU64);

impl PaddedCounter {
    const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    fn add(&self, bytes: usize) {
        self.0.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

static ALLOC_BYTES: PaddedCounter = PaddedCounter::new();
static DEALLOC_BYTES: PaddedCounter = PaddedCounter::new();
static ALLOC_CALLS: PaddedCounter = PaddedCounter::new();

/// Delegates to `System` and records byte totals.
pub struct CountingAllocator;

// SAFETY: every call is forwarded unchanged to `System`; only statistics are recorded,
// so the layout and size contracts of `GlobalAlloc` are upheld by the system allocator.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            ALLOC_BYTES.add(layout.size());
            ALLOC_CALLS.add(1);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            ALLOC_BYTES.add(layout.size());
            ALLOC_CALLS.add(1);
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // ledger style: record the growth or shrink, not both sides
            let old_size = layout.size();
            if new_size >= old_size {
                ALLOC_BYTES.add(new_size - old_size);
            } else {
                DEALLOC_BYTES.add(old_size - new_size);
            }
        }
        new_ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        DEALLOC_BYTES.add(layout.size());
    }
}

/// Bytes currently allocated through the counting allocator.
#[inline]
pub fn live_bytes() -> u64 {
    ALLOC_BYTES.get().saturating_sub(DEALLOC_BYTES.get())
}

/// `true` once at least one allocation went through [`CountingAllocator`].
#[inline]
pub fn counting_installed() -> bool {
    ALLOC_CALLS.get() > 0
}
