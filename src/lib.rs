//! Distance-based KL-divergence criterion over strided tensors.
//!
//! Built on the `strided-kernel` traversal engine: the criterion validates
//! its operands, resizes the output, then hands a per-element closure to a
//! ternary map (unreduced mode) or an in-order fold (reduced mode).
//!
//! # Core Types
//!
//! - [`DistKlDivCriterion`]: `size_average` / `reduce` configuration with
//!   forward ([`update_output`](DistKlDivCriterion::update_output)) and
//!   backward ([`update_grad_input`](DistKlDivCriterion::update_grad_input))
//!   passes
//! - [`StridedArray`] / [`StridedView`] / [`StridedViewMut`]: operands
//! - [`ExecPolicy`]: sequential or parallel execution of elementwise maps
//!
//! # Features
//!
//! - `parallel` (default): rayon fan-out for maps over more than
//!   [`PARALLEL_OVERHEAD_THRESHOLD`] elements
//!
//! # Example
//!
//! ```rust
//! use strided_criterion::{DistKlDivCriterion, StridedArray};
//!
//! let input = StridedArray::from_vec(vec![0.0, 0.0, 0.0], &[3]).unwrap();
//! let target = StridedArray::from_vec(vec![std::f64::consts::E, 0.0, 0.0], &[3]).unwrap();
//!
//! let loss = DistKlDivCriterion::new(true, true)
//!     .forward(&input.view(), &target.view())
//!     .unwrap();
//! assert!((loss.get_linear(0) - std::f64::consts::E / 3.0).abs() < 1e-12);
//!
//! let per_elem = DistKlDivCriterion::new(true, false)
//!     .forward(&input.view(), &target.view())
//!     .unwrap();
//! assert_eq!(per_elem.dims(), &[3]);
//! ```

pub mod dist_kl_div;

pub use dist_kl_div::{
    dist_kl_div_update_grad_input, dist_kl_div_update_output, DistKlDivCriterion,
};
pub use strided_kernel::{ExecPolicy, PARALLEL_OVERHEAD_THRESHOLD};
pub use strided_traits::Real;
pub use strided_view::{Result, StridedArray, StridedError, StridedView, StridedViewMut};
