//! Execution policy and rayon-based range splitting.
//!
//! Whether a traversal may fan out is carried explicitly by [`ExecPolicy`]
//! instead of being read from ambient global state. Work handed to worker
//! threads always runs under a nested policy, so a traversal started from
//! inside a parallel region stays sequential.

#[cfg(feature = "parallel")]
use crate::Result;

/// Element count at or below which a map always runs sequentially.
///
/// Below this size, dispatching to the thread pool costs more than the
/// elementwise work it would spread out.
pub const PARALLEL_OVERHEAD_THRESHOLD: usize = 10;

/// Execution context handed to the elementwise traversals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecPolicy {
    fan_out: bool,
    nthreads: usize,
    min_len: usize,
}

impl ExecPolicy {
    /// Policy for the calling thread.
    ///
    /// Fan-out is permitted unless the caller is itself a rayon worker, or
    /// the crate was built without the `parallel` feature.
    pub fn current() -> Self {
        #[cfg(feature = "parallel")]
        {
            Self {
                fan_out: rayon::current_thread_index().is_none(),
                nthreads: rayon::current_num_threads(),
                min_len: PARALLEL_OVERHEAD_THRESHOLD,
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self::sequential()
        }
    }

    /// Policy that never fans out.
    pub const fn sequential() -> Self {
        Self {
            fan_out: false,
            nthreads: 1,
            min_len: PARALLEL_OVERHEAD_THRESHOLD,
        }
    }

    /// Policy for work already running inside a parallel region.
    pub fn nested(self) -> Self {
        Self {
            fan_out: false,
            ..self
        }
    }

    /// Override the number of worker shares the index range is split into.
    pub fn with_threads(self, nthreads: usize) -> Self {
        Self {
            nthreads: nthreads.max(1),
            ..self
        }
    }

    /// Override the sequential-fallback threshold.
    pub fn with_min_len(self, min_len: usize) -> Self {
        Self { min_len, ..self }
    }

    #[inline]
    pub fn allows_fan_out(&self) -> bool {
        self.fan_out
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.nthreads
    }

    #[inline]
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Whether a map over `len` elements should run on the thread pool.
    ///
    /// Always false on a rayon worker thread, even for a policy built
    /// outside the pool.
    #[inline]
    pub fn should_fan_out(&self, len: usize) -> bool {
        self.fan_out && self.nthreads > 1 && len > self.min_len && !on_worker_thread()
    }

    /// Chunk length that gives each worker share one contiguous slice.
    #[cfg(feature = "parallel")]
    pub(crate) fn chunk_len(&self, len: usize) -> usize {
        ((len + self.nthreads - 1) / self.nthreads).max(1)
    }
}

#[inline]
fn on_worker_thread() -> bool {
    #[cfg(feature = "parallel")]
    {
        rayon::current_thread_index().is_some()
    }
    #[cfg(not(feature = "parallel"))]
    {
        true
    }
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self::current()
    }
}

/// A raw pointer wrapper that is `Send` + `Sync`.
///
/// # Safety
/// The caller must guarantee that the pointed-to data is valid for the
/// lifetime of any parallel operation and that different threads write to
/// disjoint elements.
#[cfg(feature = "parallel")]
pub(crate) struct SendPtr<T>(pub(crate) *mut T);

#[cfg(feature = "parallel")]
impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

#[cfg(feature = "parallel")]
impl<T> Copy for SendPtr<T> {}

#[cfg(feature = "parallel")]
unsafe impl<T> Send for SendPtr<T> {}
#[cfg(feature = "parallel")]
unsafe impl<T> Sync for SendPtr<T> {}

#[cfg(feature = "parallel")]
impl<T> SendPtr<T> {
    pub(crate) fn as_ptr(self) -> *mut T {
        self.0
    }

    pub(crate) fn as_const(self) -> *const T {
        self.0 as *const T
    }
}

/// Recursive range splitting over `[start, end)`.
///
/// The range is halved with `rayon::join`, and so is the thread budget,
/// until a subrange owns a single thread or is no longer than `min_len`.
/// `f` is then called once per leaf with its contiguous subrange.
#[cfg(feature = "parallel")]
pub(crate) fn split_range_threaded<F>(
    start: usize,
    end: usize,
    nthreads: usize,
    min_len: usize,
    f: &F,
) -> Result<()>
where
    F: Fn(usize, usize) -> Result<()> + Sync,
{
    let total = end - start;
    if nthreads <= 1 || total <= min_len {
        return f(start, end);
    }

    let mid = start + total / 2;
    let nt_left = nthreads / 2;
    let nt_right = nthreads - nt_left;

    let (r1, r2) = rayon::join(
        || split_range_threaded(start, mid, nt_left, min_len, f),
        || split_range_threaded(mid, end, nt_right, min_len, f),
    );
    r1?;
    r2?;
    Ok(())
}
