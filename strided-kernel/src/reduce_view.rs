//! Reduce operations on dynamic-rank strided views.

use log::trace;
use strided_view::StridedView;

use crate::kernel::{ensure_same_len, fold_runs, LinearCursor};
use crate::Result;

/// Paired map-reduce: `reduce(init, reduce_fn, map_fn.(a, b))`.
///
/// Elements are folded strictly in logical-index order starting from `init`,
/// so the result is deterministic for non-associative `reduce_fn` (such as
/// floating-point addition). The reduction always runs on the calling thread.
///
/// Fails with [`StridedError::ShapeMismatch`](crate::StridedError::ShapeMismatch)
/// if `a` and `b` have different element counts.
pub fn zip_mapreduce2<A, B, M, R, U>(
    a: &StridedView<A>,
    b: &StridedView<B>,
    map_fn: M,
    reduce_fn: R,
    init: U,
) -> Result<U>
where
    A: Copy,
    B: Copy,
    M: Fn(A, B) -> U,
    R: Fn(U, U) -> U,
{
    let len = ensure_same_len(a.dims(), b.dims())?;
    if len == 0 {
        return Ok(init);
    }

    let a_ptr = a.ptr();
    let b_ptr = b.ptr();

    if a.is_contiguous() && b.is_contiguous() {
        trace!("zip_mapreduce2: contiguous, len={len}");
        let sa = unsafe { std::slice::from_raw_parts(a_ptr, len) };
        let sb = unsafe { std::slice::from_raw_parts(b_ptr, len) };
        let mut acc = init;
        for (&x, &y) in sa.iter().zip(sb) {
            acc = reduce_fn(acc, map_fn(x, y));
        }
        return Ok(acc);
    }

    trace!("zip_mapreduce2: strided, len={len}");
    let mut cursors = [
        LinearCursor::new(a.dims(), a.strides()),
        LinearCursor::new(b.dims(), b.strides()),
    ];
    let acc = fold_runs(&mut cursors, 0, len, init, |mut acc, offsets, run, strides| {
        let mut ap = a_ptr.wrapping_offset(offsets[0]);
        let mut bp = b_ptr.wrapping_offset(offsets[1]);
        for _ in 0..run {
            let (x, y) = unsafe { (*ap, *bp) };
            acc = reduce_fn(acc, map_fn(x, y));
            ap = ap.wrapping_offset(strides[0]);
            bp = bp.wrapping_offset(strides[1]);
        }
        acc
    });
    Ok(acc)
}

/// Fold a single view: `reduce(init, reduce_fn, map_fn.(src))`.
pub fn mapreduce<T, M, R, U>(src: &StridedView<T>, map_fn: M, reduce_fn: R, init: U) -> Result<U>
where
    T: Copy,
    M: Fn(T) -> U,
    R: Fn(U, U) -> U,
{
    zip_mapreduce2(src, src, |x, _| map_fn(x), reduce_fn, init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strided_view::StridedArray;

    #[test]
    fn test_sum_of_products_contiguous() {
        let a = StridedArray::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let b = StridedArray::from_vec(vec![4.0, 5.0, 6.0], &[3]).unwrap();
        let s = zip_mapreduce2(&a.view(), &b.view(), |x, y| x * y, |p, q| p + q, 0.0).unwrap();
        assert_eq!(s, 32.0);
    }

    #[test]
    fn test_order_is_logical() {
        // Collect pairs to observe the fold order on a transposed operand.
        let a = StridedArray::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let at = a.view().permute(&[1, 0]).unwrap();
        let b = StridedArray::from_vec(vec![0, 1, 2, 3, 4, 5], &[6]).unwrap();
        let seen = zip_mapreduce2(
            &at,
            &b.view(),
            |x, y| vec![(x, y)],
            |mut acc, v| {
                acc.extend(v);
                acc
            },
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            seen,
            vec![(1, 0), (4, 1), (2, 2), (5, 3), (3, 4), (6, 5)]
        );
    }

    #[test]
    fn test_empty_returns_init() {
        let a = StridedArray::<f64>::row_major(&[0]);
        let b = StridedArray::<f64>::row_major(&[2, 0]);
        let s = zip_mapreduce2(&a.view(), &b.view(), |x, y| x + y, |p, q| p + q, 7.5).unwrap();
        assert_eq!(s, 7.5);
    }

    #[test]
    fn test_mismatch() {
        let a = StridedArray::<f64>::row_major(&[4]);
        let b = StridedArray::<f64>::row_major(&[5]);
        assert!(zip_mapreduce2(&a.view(), &b.view(), |x, y| x + y, |p, q| p + q, 0.0).is_err());
    }

    #[test]
    fn test_mapreduce_single() {
        let a = StridedArray::from_vec(vec![1.0, -2.0, 3.0, -4.0], &[2, 2]).unwrap();
        let t = a.view().permute(&[1, 0]).unwrap();
        let m = mapreduce(&t, f64::abs, f64::max, 0.0).unwrap();
        assert_eq!(m, 4.0);
    }
}
