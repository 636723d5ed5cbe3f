//! Heap accounting and snapshots.
//!
//! `CountingAllocator` wraps the system allocator and keeps running totals.
//! The binary installs it as the global allocator and calls
//! `CountingAllocator::mark_installed`; until then snapshots report
//! `tracking: false`.

use std::alloc::{GlobalAlloc, Layout, System};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static FREED_BYTES: AtomicU64 = AtomicU64::new(0);
static PEAK_LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// System allocator with allocation counters.
pub struct CountingAllocator;

impl CountingAllocator {
    /// Record that this allocator is the process's global allocator.
    pub fn mark_installed() {
        INSTALLED.store(true, Ordering::Relaxed);
    }

    fn record_alloc(size: usize) {
        let size = size as u64;
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        let allocated = ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed) + size;
        let live = allocated.saturating_sub(FREED_BYTES.load(Ordering::Relaxed));
        PEAK_LIVE_BYTES.fetch_max(live, Ordering::Relaxed);
    }

    fn record_dealloc(size: usize) {
        DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        FREED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded unchanged to `System`; the counters are
// plain atomics and never allocate.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        Self::record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            Self::record_dealloc(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}

/// Point-in-time heap totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapSnapshot {
    pub captured_at_unix_secs: u64,
    pub allocated_bytes: u64,
    pub freed_bytes: u64,
    pub live_bytes: u64,
    pub peak_live_bytes: u64,
    pub allocations: u64,
    pub deallocations: u64,
    pub live_allocations: u64,
    /// False when `CountingAllocator` is not the global allocator.
    pub tracking: bool,
}

impl HeapSnapshot {
    pub fn capture() -> Self {
        let allocated_bytes = ALLOCATED_BYTES.load(Ordering::Relaxed);
        let freed_bytes = FREED_BYTES.load(Ordering::Relaxed);
        let allocations = ALLOCATIONS.load(Ordering::Relaxed);
        let deallocations = DEALLOCATIONS.load(Ordering::Relaxed);

        Self {
            captured_at_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            allocated_bytes,
            freed_bytes,
            live_bytes: allocated_bytes.saturating_sub(freed_bytes),
            peak_live_bytes: PEAK_LIVE_BYTES.load(Ordering::Relaxed),
            allocations,
            deallocations,
            live_allocations: allocations.saturating_sub(deallocations),
            tracking: INSTALLED.load(Ordering::Relaxed),
        }
    }

    /// Write the snapshot as pretty JSON.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Capture a snapshot and write it to `writer`.
pub fn write_heap_profile<W: Write>(writer: W) -> io::Result<()> {
    HeapSnapshot::capture().write_to(writer)
}
