//! Strided tensor view types for elementwise kernels.
//!
//! # Core Types
//!
//! - [`StridedView`] / [`StridedViewMut`]: Dynamic-rank strided views over existing data
//! - [`StridedArray`]: Owned strided multidimensional array (the kernel-facing "tensor")
//!
//! Every type exposes its element count, a row-major contiguity check, and a
//! mapping from a linear logical index (row-major over the view's own shape)
//! to the physical element offset. Tensors with different shapes but equal
//! element count are paired elementwise through that logical index.
//!
//! # Example
//!
//! ```rust
//! use strided_view::StridedArray;
//!
//! let a = StridedArray::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let t = a.view().permute(&[1, 0]).unwrap();
//! assert!(!t.is_contiguous());
//! // Logical index 1 of the transposed view is element [0, 1] of `t`.
//! assert_eq!(t.get_linear(1), 4.0);
//! ```

pub mod view;

pub use view::{
    col_major_strides, is_row_major_contiguous, linear_to_offset, row_major_strides,
    StridedArray, StridedView, StridedViewMut,
};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during strided array operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StridedError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Two operands that must be paired elementwise have different element counts.
    #[error("shape mismatch: {0:?} vs {1:?} have different element counts")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// A single-element tensor was required.
    #[error("expected a single-element tensor, got dims {dims:?}")]
    Dimensionality { dims: Vec<usize> },

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// A mutable view would write one element through several logical indices.
    #[error("invalid stride 0 for dim {dim} of a mutable view")]
    ZeroStride { dim: usize },

    /// A mutable view would write one element through several logical indices.
    #[error("overlapping strides: axis {dim} steps inside the extent of a smaller axis")]
    OverlappingStrides { dim: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Buffer length doesn't match the element count implied by the dimensions.
    #[error("buffer of length {len} cannot hold dims {dims:?}")]
    BufferLength { len: usize, dims: Vec<usize> },

    /// Integer overflow while computing array offset.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,

    /// Failed to convert a scalar value (e.g. an element count) into the element type.
    #[error("failed to convert scalar for scaling")]
    ScalarConversion,
}

/// Result type for strided array operations.
pub type Result<T> = std::result::Result<T, StridedError>;
