//! Process-wide scheduler parallelism.
//!
//! The configured value is recorded here during bootstrap and read back when
//! the multi-thread runtime is built. Zero means "use one worker per logical
//! CPU".

use std::sync::atomic::{AtomicUsize, Ordering};

static PARALLELISM: AtomicUsize = AtomicUsize::new(0);

/// Number of logical CPUs available to the process.
pub fn available_cpus() -> usize {
    num_cpus::get()
}

/// Set the worker thread count and return the previous setting.
///
/// A zero `threads` leaves the current setting unchanged.
pub fn set_parallelism(threads: usize) -> usize {
    if threads == 0 {
        return PARALLELISM.load(Ordering::Relaxed);
    }
    PARALLELISM.swap(threads, Ordering::Relaxed)
}

/// Explicitly configured worker count, 0 when unset.
pub fn parallelism() -> usize {
    PARALLELISM.load(Ordering::Relaxed)
}

/// Worker threads the runtime should start with.
pub fn worker_threads() -> usize {
    match parallelism() {
        0 => available_cpus().max(1),
        n => n,
    }
}
