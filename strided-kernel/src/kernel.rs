//! Linear-index cursors for walking strided operands in lockstep.
//!
//! Each operand is walked in its own row-major logical order, so operands
//! with different shapes but equal element count are paired by logical
//! index. A cursor tracks one operand's multi-index and element offset and
//! reports how many elements remain before its innermost axis wraps; the
//! driver hands the longest run all cursors agree on to an inner loop.

use smallvec::SmallVec;

use crate::{Result, StridedError};

/// Stack-allocated Vec for dims/strides after fusion (typically 1-3 axes).
type SVec<T> = SmallVec<[T; 8]>;

/// Fuse axes that can be walked as one without changing row-major order.
///
/// Size-1 axes are dropped, and axis `i` merges into axis `i + 1` whenever
/// `strides[i] == strides[i + 1] * dims[i + 1]`. A contiguous operand always
/// fuses down to a single axis with stride 1.
pub(crate) fn fuse_row_major(dims: &[usize], strides: &[isize]) -> (SVec<usize>, SVec<isize>) {
    let mut fused_dims: SVec<usize> = SmallVec::new();
    let mut fused_strides: SVec<isize> = SmallVec::new();
    for (&d, &s) in dims.iter().zip(strides.iter()) {
        if d == 1 {
            continue;
        }
        fused_dims.push(d);
        fused_strides.push(s);
    }
    // Merge from the innermost axis outwards.
    let mut i = fused_dims.len();
    while i > 1 {
        i -= 1;
        let inner_dim = fused_dims[i];
        let inner_stride = fused_strides[i];
        if fused_strides[i - 1] == inner_stride * inner_dim as isize {
            fused_dims[i - 1] *= inner_dim;
            fused_strides[i - 1] = inner_stride;
            fused_dims.remove(i);
            fused_strides.remove(i);
        }
    }
    (fused_dims, fused_strides)
}

/// Position of one operand within its own logical index space.
#[derive(Clone, Debug)]
pub(crate) struct LinearCursor {
    dims: SVec<usize>,
    strides: SVec<isize>,
    index: SVec<usize>,
    offset: isize,
}

impl LinearCursor {
    pub(crate) fn new(dims: &[usize], strides: &[isize]) -> Self {
        let (dims, strides) = fuse_row_major(dims, strides);
        let index = SmallVec::from_elem(0, dims.len());
        Self {
            dims,
            strides,
            index,
            offset: 0,
        }
    }

    /// Element offset of the current position, relative to the operand base.
    #[inline]
    pub(crate) fn offset(&self) -> isize {
        self.offset
    }

    /// Move to logical index `linear`.
    pub(crate) fn seek(&mut self, linear: usize) {
        let mut rem = linear;
        let mut offset = 0isize;
        for d in (0..self.dims.len()).rev() {
            let i = rem % self.dims[d];
            rem /= self.dims[d];
            self.index[d] = i;
            offset += i as isize * self.strides[d];
        }
        self.offset = offset;
    }

    /// Elements left on the innermost axis, including the current one.
    #[inline]
    pub(crate) fn run_len(&self) -> usize {
        match self.dims.last() {
            Some(&d) => d - self.index[self.dims.len() - 1],
            // Rank 0 after fusion: a single element.
            None => 1,
        }
    }

    /// Stride along the innermost axis.
    #[inline]
    pub(crate) fn inner_stride(&self) -> isize {
        self.strides.last().copied().unwrap_or(1)
    }

    /// Step forward `n <= run_len()` elements, carrying into outer axes.
    pub(crate) fn advance(&mut self, n: usize) {
        let rank = self.dims.len();
        if rank == 0 {
            return;
        }
        let mut d = rank - 1;
        self.index[d] += n;
        self.offset += n as isize * self.strides[d];
        while self.index[d] == self.dims[d] {
            self.offset -= self.dims[d] as isize * self.strides[d];
            self.index[d] = 0;
            if d == 0 {
                break;
            }
            d -= 1;
            self.index[d] += 1;
            self.offset += self.strides[d];
        }
    }
}

/// Fold over the runs covering logical indices `[start, end)` of `N`
/// operands walked in lockstep.
///
/// `f` receives the accumulator, the per-operand offsets at the start of a
/// run, the run length, and the per-operand strides valid throughout that run.
pub(crate) fn fold_runs<const N: usize, U, F>(
    cursors: &mut [LinearCursor; N],
    start: usize,
    end: usize,
    init: U,
    mut f: F,
) -> U
where
    F: FnMut(U, &[isize; N], usize, &[isize; N]) -> U,
{
    let mut acc = init;
    if start >= end {
        return acc;
    }
    for c in cursors.iter_mut() {
        c.seek(start);
    }
    let mut pos = start;
    while pos < end {
        let len = cursors
            .iter()
            .fold(end - pos, |len, c| len.min(c.run_len()));
        let offsets: [isize; N] = std::array::from_fn(|k| cursors[k].offset());
        let strides: [isize; N] = std::array::from_fn(|k| cursors[k].inner_stride());
        acc = f(acc, &offsets, len, &strides);
        for c in cursors.iter_mut() {
            c.advance(len);
        }
        pos += len;
    }
    acc
}

/// Walk logical indices `[start, end)` of `N` operands in lockstep.
///
/// Stops calling `f` after the first error.
pub(crate) fn for_each_run<const N: usize, F>(
    cursors: &mut [LinearCursor; N],
    start: usize,
    end: usize,
    mut f: F,
) -> Result<()>
where
    F: FnMut(&[isize; N], usize, &[isize; N]) -> Result<()>,
{
    fold_runs(cursors, start, end, Ok(()), |acc, offsets, len, strides| {
        acc.and_then(|()| f(offsets, len, strides))
    })
}

// ============================================================================
// Utility functions
// ============================================================================

/// Check that two operands have the same element count; returns that count.
pub fn ensure_same_len(a: &[usize], b: &[usize]) -> Result<usize> {
    let la = total_len(a);
    let lb = total_len(b);
    if la != lb {
        return Err(StridedError::ShapeMismatch(a.to_vec(), b.to_vec()));
    }
    Ok(la)
}

pub(crate) fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}
