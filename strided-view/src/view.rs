//! Dynamic-rank strided view types.
//!
//! - [`StridedView`]: Immutable dynamic-rank strided view
//! - [`StridedViewMut`]: Mutable dynamic-rank strided view
//! - [`StridedArray`]: Owned strided multidimensional array
//!
//! Logical element order is always row-major over a view's own dims: linear
//! index `i` decomposes with the last axis varying fastest, independent of
//! the strides.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::{Result, StridedError};

// ============================================================================
// Layout helpers
// ============================================================================

/// Validate that all accessed offsets stay within `[0, len)`.
fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    // Empty array - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 {
        return Err(StridedError::OffsetOverflow);
    }
    if max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

/// Reject layouts where two logical indices of a writable view address
/// the same element.
///
/// Axes longer than one are ordered by `|stride|`; each must step past the
/// full extent of the axes below it.
fn validate_writable(dims: &[usize], strides: &[isize]) -> Result<()> {
    let mut axes: Vec<(usize, usize, usize)> = Vec::with_capacity(dims.len());
    for (dim, (&d, &s)) in dims.iter().zip(strides.iter()).enumerate() {
        if d <= 1 {
            continue;
        }
        if s == 0 {
            return Err(StridedError::ZeroStride { dim });
        }
        axes.push((dim, d, s.unsigned_abs()));
    }
    axes.sort_by_key(|&(_, _, s)| s);
    for pair in axes.windows(2) {
        let (_, inner_dim, inner_stride) = pair[0];
        let (dim, _, stride) = pair[1];
        if stride < inner_stride.saturating_mul(inner_dim) {
            return Err(StridedError::OverlappingStrides { dim });
        }
    }
    Ok(())
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Whether `(dims, strides)` is the canonical row-major layout.
///
/// Axes with `dim <= 1` are ignored since they never vary. Negative-stride
/// views are never contiguous.
pub fn is_row_major_contiguous(dims: &[usize], strides: &[isize]) -> bool {
    if dims.len() != strides.len() {
        return false;
    }
    let mut expected = 1isize;
    for (&dim, &stride) in dims.iter().rev().zip(strides.iter().rev()) {
        if dim <= 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = expected.saturating_mul(dim as isize);
    }
    true
}

/// Map a linear logical index to an element offset (relative to the base).
///
/// `linear` must be below the element count of `dims`.
pub fn linear_to_offset(dims: &[usize], strides: &[isize], linear: usize) -> isize {
    let mut rem = linear;
    let mut offset = 0isize;
    for (&dim, &stride) in dims.iter().rev().zip(strides.iter().rev()) {
        offset += (rem % dim) as isize * stride;
        rem /= dim;
    }
    offset
}

/// Offset of a multi-index, with bounds assertions.
#[inline]
fn multi_to_offset(dims: &[usize], strides: &[isize], indices: &[usize]) -> isize {
    assert_eq!(indices.len(), dims.len(), "wrong number of indices");
    let mut idx = 0isize;
    for (i, &index) in indices.iter().enumerate() {
        assert!(
            index < dims[i],
            "index {} out of bounds for dim {}",
            index,
            dims[i]
        );
        idx += index as isize * strides[i];
    }
    idx
}

fn permuted(dims: &[usize], strides: &[isize], perm: &[usize]) -> Result<(Vec<usize>, Vec<isize>)> {
    let rank = dims.len();
    if perm.len() != rank {
        return Err(StridedError::RankMismatch(perm.len(), rank));
    }
    let mut seen = vec![false; rank];
    for &p in perm {
        if p >= rank || seen[p] {
            return Err(StridedError::InvalidAxis { axis: p, rank });
        }
        seen[p] = true;
    }
    let new_dims = perm.iter().map(|&p| dims[p]).collect();
    let new_strides = perm.iter().map(|&p| strides[p]).collect();
    Ok((new_dims, new_strides))
}

// ============================================================================
// StridedView
// ============================================================================

/// Dynamic-rank immutable strided view.
///
/// Dims and strides are reference-counted so cloning a view or handing it to
/// worker threads never copies layout metadata.
pub struct StridedView<'a, T> {
    ptr: *const T,
    data: &'a [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

unsafe impl<T: Send> Send for StridedView<'_, T> {}
unsafe impl<T: Sync> Sync for StridedView<'_, T> {}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            data: self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedView")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> StridedView<'a, T> {
    /// Create a new immutable strided view from a borrowed slice.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        let ptr = data.as_ptr().wrapping_offset(offset);
        Ok(Self {
            ptr,
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// Create a view without bounds checking.
    ///
    /// # Safety
    /// The caller must ensure all index combinations stay within bounds.
    pub unsafe fn new_unchecked(
        data: &'a [T],
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Self {
        let ptr = data.as_ptr().offset(offset);
        Self {
            ptr,
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element count. A rank-0 view holds one element.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// Whether the view is laid out in canonical row-major order.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        is_row_major_contiguous(&self.dims, &self.strides)
    }

    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Raw const pointer to element at the view's base offset.
    #[inline]
    pub fn ptr(&self) -> *const T {
        self.ptr
    }

    /// Offset from [`ptr`](Self::ptr) of the element at logical index `linear`.
    #[inline]
    pub fn linear_offset(&self, linear: usize) -> isize {
        linear_to_offset(&self.dims, &self.strides, linear)
    }

    /// Permute dimensions.
    pub fn permute(&self, perm: &[usize]) -> Result<StridedView<'a, T>> {
        let (dims, strides) = permuted(&self.dims, &self.strides, perm)?;
        Ok(StridedView {
            ptr: self.ptr,
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset: self.offset,
        })
    }
}

impl<'a, T: Copy> StridedView<'a, T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        let idx = multi_to_offset(&self.dims, &self.strides, indices);
        unsafe { *self.ptr.offset(idx) }
    }

    /// Get the element at a linear logical (row-major) index.
    pub fn get_linear(&self, linear: usize) -> T {
        let len = self.len();
        assert!(linear < len, "linear index {linear} out of bounds for {len} elements");
        unsafe { *self.ptr.offset(self.linear_offset(linear)) }
    }

    /// Collect all elements in logical row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.get_linear(i)).collect()
    }
}

// ============================================================================
// StridedViewMut
// ============================================================================

/// Dynamic-rank mutable strided view.
///
/// Construction rejects layouts in which two logical indices share an
/// element, so disjoint index ranges may be written from different threads.
pub struct StridedViewMut<'a, T> {
    ptr: *mut T,
    data: &'a mut [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

unsafe impl<T: Send> Send for StridedViewMut<'_, T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedViewMut")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> StridedViewMut<'a, T> {
    /// Create a new mutable strided view.
    ///
    /// Fails with [`StridedError::ZeroStride`] if a dimension longer than one
    /// has stride 0, and with [`StridedError::OverlappingStrides`] if two
    /// logical indices would otherwise share an element.
    pub fn new(
        data: &'a mut [T],
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        validate_writable(dims, strides)?;
        let ptr = data.as_mut_ptr().wrapping_offset(offset);
        Ok(Self {
            ptr,
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// Create without bounds checking.
    ///
    /// # Safety
    /// Caller must ensure all index combinations stay within bounds and that
    /// no two logical indices address the same element.
    pub unsafe fn new_unchecked(
        data: &'a mut [T],
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Self {
        let ptr = data.as_mut_ptr().offset(offset);
        Self {
            ptr,
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        is_row_major_contiguous(&self.dims, &self.strides)
    }

    /// Raw const pointer to element at the view's base offset.
    #[inline]
    pub fn ptr(&self) -> *const T {
        self.ptr as *const T
    }

    /// Raw mutable pointer to element at the view's base offset.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub fn linear_offset(&self, linear: usize) -> isize {
        linear_to_offset(&self.dims, &self.strides, linear)
    }

    /// Permute dimensions, consuming the mutable view.
    ///
    /// Takes `self` by value to prevent aliasing of mutable views.
    pub fn permute(self, perm: &[usize]) -> Result<StridedViewMut<'a, T>> {
        let (dims, strides) = permuted(&self.dims, &self.strides, perm)?;
        Ok(StridedViewMut {
            ptr: self.ptr,
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset: self.offset,
        })
    }

    /// Reborrow as an immutable view.
    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView {
            ptr: self.ptr as *const T,
            data: &*self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<'a, T: Copy> StridedViewMut<'a, T> {
    /// Get an element.
    pub fn get(&self, indices: &[usize]) -> T {
        let idx = multi_to_offset(&self.dims, &self.strides, indices);
        unsafe { *self.ptr.offset(idx) }
    }

    /// Set an element.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let idx = multi_to_offset(&self.dims, &self.strides, indices);
        unsafe {
            *self.ptr.offset(idx) = value;
        }
    }

    /// Get the element at a linear logical index.
    pub fn get_linear(&self, linear: usize) -> T {
        let len = self.len();
        assert!(linear < len, "linear index {linear} out of bounds for {len} elements");
        unsafe { *self.ptr.offset(self.linear_offset(linear)) }
    }

    /// Set the element at a linear logical index.
    pub fn set_linear(&mut self, linear: usize, value: T) {
        let len = self.len();
        assert!(linear < len, "linear index {linear} out of bounds for {len} elements");
        unsafe {
            *self.ptr.offset(self.linear_offset(linear)) = value;
        }
    }
}

// ============================================================================
// StridedArray
// ============================================================================

/// Owned strided multidimensional array.
///
/// Outputs of the criterion kernels are `StridedArray`s: they are resized in
/// place to the shape the operation produces before being written.
pub struct StridedArray<T> {
    data: Vec<T>,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedArray")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Clone> Clone for StridedArray<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Clone + Default> StridedArray<T> {
    /// Create a column-major array filled with default values.
    pub fn col_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
            strides: Arc::from(col_major_strides(dims)),
            offset: 0,
        }
    }

    /// Create a row-major array filled with default values.
    pub fn row_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }

    /// Create a column-major array with values produced by a function.
    ///
    /// The function is called with indices in column-major iteration order.
    pub fn from_fn_col_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = dims.iter().product();
        let rank = dims.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in 0..rank {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(col_major_strides(dims)),
            offset: 0,
        }
    }

    /// Create a row-major array with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    pub fn from_fn_row_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = dims.iter().product();
        let rank = dims.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }

    /// Resize to `dims`.
    ///
    /// Keeps layout and contents when `dims` already match. Otherwise the
    /// array is reallocated as row-major and filled with default values.
    pub fn resize_as(&mut self, dims: &[usize]) {
        if *self.dims == *dims {
            return;
        }
        let total: usize = dims.iter().product();
        self.data.clear();
        self.data.resize(total, T::default());
        self.dims = Arc::from(dims);
        self.strides = Arc::from(row_major_strides(dims));
        self.offset = 0;
    }

    /// Resize to a one-dimensional array of `len` elements.
    pub fn resize_1d(&mut self, len: usize) {
        self.resize_as(&[len]);
    }
}

impl<T> StridedArray<T> {
    /// Wrap a row-major buffer.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let total: usize = dims.iter().product();
        if data.len() != total {
            return Err(StridedError::BufferLength {
                len: data.len(),
                dims: dims.to_vec(),
            });
        }
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        })
    }

    /// Create from raw parts.
    ///
    /// Rejects layouts that leave the buffer or reach one element through
    /// more than one logical index.
    pub fn from_parts(
        data: Vec<T>,
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        validate_writable(dims, strides)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        is_row_major_contiguous(&self.dims, &self.strides)
    }

    /// Backing buffer in memory order.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Index into [`data`](Self::data) of the element at logical index `linear`.
    #[inline]
    pub fn linear_offset(&self, linear: usize) -> isize {
        self.offset + linear_to_offset(&self.dims, &self.strides, linear)
    }

    /// Create an immutable view over this array.
    pub fn view(&self) -> StridedView<'_, T> {
        let ptr = self.data.as_ptr().wrapping_offset(self.offset);
        StridedView {
            ptr,
            data: &self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Create a mutable view over this array.
    pub fn view_mut(&mut self) -> StridedViewMut<'_, T> {
        let ptr = self.data.as_mut_ptr().wrapping_offset(self.offset);
        StridedViewMut {
            ptr,
            data: &mut self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Copy> StridedArray<T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.view().get(indices)
    }

    /// Set an element by multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let idx = self.offset + multi_to_offset(&self.dims, &self.strides, indices);
        self.data[idx as usize] = value;
    }

    /// Get the element at a linear logical index.
    pub fn get_linear(&self, linear: usize) -> T {
        let len = self.len();
        assert!(linear < len, "linear index {linear} out of bounds for {len} elements");
        self.data[self.linear_offset(linear) as usize]
    }

    /// Set the element at a linear logical index.
    pub fn set_linear(&mut self, linear: usize, value: T) {
        let len = self.len();
        assert!(linear < len, "linear index {linear} out of bounds for {len} elements");
        let idx = self.linear_offset(linear) as usize;
        self.data[idx] = value;
    }

    /// Collect all elements in logical row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.view().to_vec()
    }
}

impl<T> Index<&[usize]> for StridedArray<T> {
    type Output = T;

    fn index(&self, indices: &[usize]) -> &T {
        let idx = self.offset + multi_to_offset(&self.dims, &self.strides, indices);
        &self.data[idx as usize]
    }
}

impl<T> IndexMut<&[usize]> for StridedArray<T> {
    fn index_mut(&mut self, indices: &[usize]) -> &mut T {
        let idx = self.offset + multi_to_offset(&self.dims, &self.strides, indices);
        &mut self.data[idx as usize]
    }
}

// ============================================================================
// Tests
// ============================================================================
