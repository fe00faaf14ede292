//! Distance-based KL-divergence criterion.
//!
//! `input` holds log-probabilities `p`, `target` holds probabilities `t`.
//! The per-element loss is `t * (ln t - p)` where `t > 0` and exactly zero
//! elsewhere, so zero targets never evaluate `ln 0`.
//!
//! Both entry points work on arbitrarily strided operands. `input` and
//! `target` only need equal element counts and are paired by logical
//! (row-major) index.

use log::debug;
use num_traits::{NumCast, Zero};
use strided_kernel::{
    ensure_same_len, zip_map2_into, zip_mapreduce2, ExecPolicy, Result, StridedArray, StridedError,
    StridedView,
};
use strided_traits::Real;

#[inline(always)]
fn kl_term<T: Real>(p: T, t: T) -> T {
    if t > T::zero() {
        t * (t.ln() - p)
    } else {
        T::zero()
    }
}

#[inline(always)]
fn kl_grad<T: Real>(g: T, t: T) -> T {
    if t > T::zero() {
        -t * g
    } else {
        T::zero()
    }
}

/// Reduced-mode gradient, associated as `(norm * -t) * g`.
#[inline(always)]
fn kl_grad_scaled<T: Real>(norm: T, g: T, t: T) -> T {
    if t > T::zero() {
        norm * -t * g
    } else {
        T::zero()
    }
}

fn elem_count<U: NumCast>(n: usize) -> Result<U> {
    <U as NumCast>::from(n).ok_or(StridedError::ScalarConversion)
}

/// KL-divergence criterion configuration.
///
/// - `reduce == false`: the output has the input's shape and holds the
///   per-element loss.
/// - `reduce == true`: the output is a single element holding the sum of the
///   per-element loss, divided by the element count when `size_average` is
///   set.
///
/// The struct carries no state between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistKlDivCriterion {
    pub size_average: bool,
    pub reduce: bool,
    policy: Option<ExecPolicy>,
}

impl Default for DistKlDivCriterion {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl DistKlDivCriterion {
    pub fn new(size_average: bool, reduce: bool) -> Self {
        Self {
            size_average,
            reduce,
            policy: None,
        }
    }

    /// Pin the execution policy used by elementwise maps.
    ///
    /// Without this, the policy is taken from the calling thread on every
    /// call (see [`ExecPolicy::current`]).
    pub fn with_exec_policy(self, policy: ExecPolicy) -> Self {
        Self {
            policy: Some(policy),
            ..self
        }
    }

    pub fn exec_policy(&self) -> ExecPolicy {
        self.policy.unwrap_or_else(ExecPolicy::current)
    }

    /// Forward pass into `output`.
    ///
    /// `output` is resized to `input`'s dims (unreduced) or to `[1]`
    /// (reduced). Nothing is written if `input` and `target` have different
    /// element counts.
    pub fn update_output<T: Real>(
        &self,
        input: &StridedView<T>,
        target: &StridedView<T>,
        output: &mut StridedArray<T>,
    ) -> Result<()> {
        let n = ensure_same_len(input.dims(), target.dims())?;
        debug!(
            "dist_kl_div update_output: n={n}, reduce={}, size_average={}",
            self.reduce, self.size_average
        );

        if !self.reduce {
            output.resize_as(input.dims());
            return zip_map2_into(
                &mut output.view_mut(),
                input,
                target,
                self.exec_policy(),
                kl_term::<T>,
            );
        }

        let mut sum = zip_mapreduce2(
            input,
            target,
            |p, t| kl_term(p, t).widen(),
            |acc, x| acc + x,
            <T::Accum as Zero>::zero(),
        )?;
        if self.size_average {
            sum = sum / elem_count::<T::Accum>(n)?;
        }
        output.resize_1d(1);
        output.set_linear(0, T::narrow(sum));
        Ok(())
    }

    /// Backward pass into `grad_input`.
    ///
    /// Unreduced: `grad_output` must have `input`'s element count and holds
    /// one upstream gradient per element. Reduced: `grad_output` must hold
    /// exactly one element, which scales every per-element gradient.
    ///
    /// All checks run before `grad_input` is resized to `input`'s dims.
    pub fn update_grad_input<T: Real>(
        &self,
        input: &StridedView<T>,
        target: &StridedView<T>,
        grad_output: &StridedView<T>,
        grad_input: &mut StridedArray<T>,
    ) -> Result<()> {
        let n = ensure_same_len(input.dims(), target.dims())?;
        debug!(
            "dist_kl_div update_grad_input: n={n}, reduce={}, size_average={}",
            self.reduce, self.size_average
        );

        if !self.reduce {
            ensure_same_len(input.dims(), grad_output.dims())?;
            grad_input.resize_as(input.dims());
            return zip_map2_into(
                &mut grad_input.view_mut(),
                grad_output,
                target,
                self.exec_policy(),
                |g, t| kl_grad(g, t),
            );
        }

        if grad_output.len() != 1 {
            return Err(StridedError::Dimensionality {
                dims: grad_output.dims().to_vec(),
            });
        }
        let g = grad_output.get_linear(0);
        let norm = if self.size_average {
            T::one() / elem_count::<T>(n)?
        } else {
            T::one()
        };

        grad_input.resize_as(input.dims());
        zip_map2_into(
            &mut grad_input.view_mut(),
            input,
            target,
            self.exec_policy(),
            move |_, t| kl_grad_scaled(norm, g, t),
        )
    }

    /// Allocate and return the forward output.
    pub fn forward<T: Real>(
        &self,
        input: &StridedView<T>,
        target: &StridedView<T>,
    ) -> Result<StridedArray<T>> {
        let mut output = StridedArray::row_major(&[0]);
        self.update_output(input, target, &mut output)?;
        Ok(output)
    }

    /// Allocate and return the gradient with respect to `input`.
    pub fn backward<T: Real>(
        &self,
        input: &StridedView<T>,
        target: &StridedView<T>,
        grad_output: &StridedView<T>,
    ) -> Result<StridedArray<T>> {
        let mut grad_input = StridedArray::row_major(&[0]);
        self.update_grad_input(input, target, grad_output, &mut grad_input)?;
        Ok(grad_input)
    }
}

/// Forward pass with the flags passed per call.
pub fn dist_kl_div_update_output<T: Real>(
    input: &StridedView<T>,
    target: &StridedView<T>,
    output: &mut StridedArray<T>,
    size_average: bool,
    reduce: bool,
) -> Result<()> {
    DistKlDivCriterion::new(size_average, reduce).update_output(input, target, output)
}

/// Backward pass with the flags passed per call.
pub fn dist_kl_div_update_grad_input<T: Real>(
    input: &StridedView<T>,
    target: &StridedView<T>,
    grad_output: &StridedView<T>,
    grad_input: &mut StridedArray<T>,
    size_average: bool,
    reduce: bool,
) -> Result<()> {
    DistKlDivCriterion::new(size_average, reduce).update_grad_input(
        input,
        target,
        grad_output,
        grad_input,
    )
}
