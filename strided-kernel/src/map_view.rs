//! Ternary map operations on dynamic-rank strided views.
//!
//! `dest` is written and the two sources are read. Operands are paired by
//! logical index (row-major over each operand's own dims), so they only need
//! equal element counts, not equal shapes.

use log::trace;
use strided_view::{StridedView, StridedViewMut};

use crate::kernel::{ensure_same_len, for_each_run, LinearCursor};
use crate::threading::ExecPolicy;
use crate::Result;

#[cfg(feature = "parallel")]
use crate::threading::{split_range_threaded, SendPtr};

// ============================================================================
// Inner loop helpers
//
// When every operand steps by 1 the run is handed out as slices so LLVM can
// vectorize it; otherwise pointers are stepped by each operand's stride.
// ============================================================================

#[inline(always)]
fn update_slices<D: Copy, A: Copy, B: Copy>(
    dst: &mut [D],
    src_a: &[A],
    src_b: &[B],
    f: &impl Fn(D, A, B) -> D,
) {
    for ((d, &x), &y) in dst.iter_mut().zip(src_a).zip(src_b) {
        *d = f(*d, x, y);
    }
}

/// Run loop: `dest[i] = f(dest[i], a[i], b[i])` for `len` elements.
#[inline(always)]
unsafe fn inner_loop_update2<D: Copy, A: Copy, B: Copy>(
    dp: *mut D,
    ds: isize,
    ap: *const A,
    a_s: isize,
    bp: *const B,
    b_s: isize,
    len: usize,
    f: &impl Fn(D, A, B) -> D,
) {
    if ds == 1 && a_s == 1 && b_s == 1 {
        let dst = std::slice::from_raw_parts_mut(dp, len);
        let src_a = std::slice::from_raw_parts(ap, len);
        let src_b = std::slice::from_raw_parts(bp, len);
        update_slices(dst, src_a, src_b, f);
    } else {
        let mut dp = dp;
        let mut ap = ap;
        let mut bp = bp;
        for _ in 0..len {
            *dp = f(*dp, *ap, *bp);
            dp = dp.wrapping_offset(ds);
            ap = ap.wrapping_offset(a_s);
            bp = bp.wrapping_offset(b_s);
        }
    }
}

/// Ternary in-place update: `dest[i] = f(dest[i], a[i], b[i])`.
///
/// Every logical index of `dest` is visited exactly once. The result for
/// index `i` depends only on the operands at index `i`, so the sequential
/// and parallel walks produce bit-identical output.
///
/// Fails with [`StridedError::ShapeMismatch`](crate::StridedError::ShapeMismatch)
/// before touching any element if the element counts differ.
pub fn zip_update2_into<D, A, B, F>(
    dest: &mut StridedViewMut<D>,
    a: &StridedView<A>,
    b: &StridedView<B>,
    policy: ExecPolicy,
    f: F,
) -> Result<()>
where
    D: Copy + Send + Sync,
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    F: Fn(D, A, B) -> D + Sync,
{
    let len = ensure_same_len(dest.dims(), a.dims())?;
    ensure_same_len(dest.dims(), b.dims())?;
    if len == 0 {
        return Ok(());
    }

    let dst_ptr = dest.as_mut_ptr();
    let a_ptr = a.ptr();
    let b_ptr = b.ptr();

    if dest.is_contiguous() && a.is_contiguous() && b.is_contiguous() {
        let dst = unsafe { std::slice::from_raw_parts_mut(dst_ptr, len) };
        let sa = unsafe { std::slice::from_raw_parts(a_ptr, len) };
        let sb = unsafe { std::slice::from_raw_parts(b_ptr, len) };

        #[cfg(feature = "parallel")]
        {
            if policy.should_fan_out(len) {
                use rayon::prelude::*;
                let chunk = policy.chunk_len(len);
                trace!("zip_update2_into: contiguous parallel, len={len}, chunk={chunk}");
                dst.par_chunks_mut(chunk)
                    .zip(sa.par_chunks(chunk))
                    .zip(sb.par_chunks(chunk))
                    .for_each(|((d, x), y)| update_slices(d, x, y, &f));
                return Ok(());
            }
        }

        trace!("zip_update2_into: contiguous sequential, len={len}");
        update_slices(dst, sa, sb, &f);
        return Ok(());
    }

    let template = [
        LinearCursor::new(dest.dims(), dest.strides()),
        LinearCursor::new(a.dims(), a.strides()),
        LinearCursor::new(b.dims(), b.strides()),
    ];

    #[cfg(feature = "parallel")]
    {
        if policy.should_fan_out(len) {
            trace!(
                "zip_update2_into: strided parallel, len={len}, threads={}",
                policy.threads()
            );
            let dst_send = SendPtr(dst_ptr);
            let a_send = SendPtr(a_ptr as *mut A);
            let b_send = SendPtr(b_ptr as *mut B);

            return split_range_threaded(
                0,
                len,
                policy.threads(),
                policy.min_len(),
                &|start, end| {
                    let mut cursors = template.clone();
                    for_each_run(&mut cursors, start, end, |offsets, run, strides| {
                        unsafe {
                            inner_loop_update2(
                                dst_send.as_ptr().offset(offsets[0]),
                                strides[0],
                                a_send.as_const().offset(offsets[1]),
                                strides[1],
                                b_send.as_const().offset(offsets[2]),
                                strides[2],
                                run,
                                &f,
                            )
                        };
                        Ok(())
                    })
                },
            );
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = policy;

    trace!("zip_update2_into: strided sequential, len={len}");
    let mut cursors = template;
    for_each_run(&mut cursors, 0, len, |offsets, run, strides| {
        unsafe {
            inner_loop_update2(
                dst_ptr.offset(offsets[0]),
                strides[0],
                a_ptr.offset(offsets[1]),
                strides[1],
                b_ptr.offset(offsets[2]),
                strides[2],
                run,
                &f,
            )
        };
        Ok(())
    })
}

/// Binary element-wise map into `dest`: `dest[i] = f(a[i], b[i])`.
///
/// Same pairing, validation and execution-mode rules as
/// [`zip_update2_into`]; the previous contents of `dest` are ignored.
pub fn zip_map2_into<D, A, B, F>(
    dest: &mut StridedViewMut<D>,
    a: &StridedView<A>,
    b: &StridedView<B>,
    policy: ExecPolicy,
    f: F,
) -> Result<()>
where
    D: Copy + Send + Sync,
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    F: Fn(A, B) -> D + Sync,
{
    zip_update2_into(dest, a, b, policy, move |_, x, y| f(x, y))
}
