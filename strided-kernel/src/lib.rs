//! Elementwise traversal engine for strided views.
//!
//! Operands are paired by logical index (row-major over each operand's own
//! shape), so any two views with the same element count can be combined even
//! when their shapes or memory layouts differ.
//!
//! # Map Operations
//!
//! - [`zip_update2_into`]: `dest[i] = f(dest[i], a[i], b[i])`
//! - [`zip_map2_into`]: `dest[i] = f(a[i], b[i])`
//!
//! Maps may fan out over a rayon pool when the `parallel` feature is on, the
//! [`ExecPolicy`] allows it, and the element count exceeds
//! [`PARALLEL_OVERHEAD_THRESHOLD`].
//!
//! # Reduce Operations
//!
//! - [`zip_mapreduce2`]: paired map followed by an in-order fold
//! - [`mapreduce`]: single-operand map-reduce
//!
//! # Example
//!
//! ```rust
//! use strided_kernel::{zip_map2_into, zip_mapreduce2, ExecPolicy, StridedArray};
//!
//! let a = StridedArray::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let b = StridedArray::from_vec(vec![1.0; 6], &[3, 2]).unwrap();
//! let mut out = StridedArray::<f64>::row_major(&[6]);
//!
//! zip_map2_into(&mut out.view_mut(), &a.view(), &b.view(), ExecPolicy::current(), |x, y| x + y)
//!     .unwrap();
//! assert_eq!(out.to_vec(), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
//!
//! let dot = zip_mapreduce2(&a.view(), &b.view(), |x, y| x * y, |p, q| p + q, 0.0).unwrap();
//! assert_eq!(dot, 21.0);
//! ```

pub(crate) mod kernel;
mod map_view;
mod reduce_view;
mod threading;

pub use strided_view::{
    col_major_strides, is_row_major_contiguous, linear_to_offset, row_major_strides,
    Result, StridedArray, StridedError, StridedView, StridedViewMut,
};

pub use kernel::ensure_same_len;
pub use map_view::{zip_map2_into, zip_update2_into};
pub use reduce_view::{mapreduce, zip_mapreduce2};
pub use threading::{ExecPolicy, PARALLEL_OVERHEAD_THRESHOLD};
