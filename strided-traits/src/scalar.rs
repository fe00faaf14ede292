//! Scalar type bounds for strided criterion kernels.

use std::fmt::Debug;

use num_traits::Float;

/// Real floating-point element type usable by the criterion kernels.
///
/// `Accum` is the accumulator for full reductions. It is at least as wide as
/// `Self`, so summing many `f32` terms does not lose precision to the
/// element type's rounding.
pub trait Real: Float + Default + Debug + Send + Sync + 'static {
    /// Reduction accumulator.
    type Accum: Float + Debug + Send + Sync;

    /// Lossless conversion into the accumulator.
    fn widen(self) -> Self::Accum;

    /// Round an accumulated value back to the element type.
    fn narrow(acc: Self::Accum) -> Self;
}

macro_rules! impl_real {
    ($t:ty => $acc:ty) => {
        impl Real for $t {
            type Accum = $acc;

            #[inline(always)]
            fn widen(self) -> $acc {
                self as $acc
            }

            #[inline(always)]
            fn narrow(acc: $acc) -> $t {
                acc as $t
            }
        }
    };
}

impl_real!(f32 => f64);
impl_real!(f64 => f64);

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_real<T: Real>() {}

    #[test]
    fn test_standard_types() {
        assert_real::<f32>();
        assert_real::<f64>();
    }

    #[test]
    fn test_f32_accumulates_in_f64() {
        let x = 16_777_216.0f32; // 2^24: f32 has no room for +1 here
        let acc = x.widen() + 1.0f32.widen();
        assert_eq!(acc, 16_777_217.0f64);
        assert_eq!(f32::narrow(acc), 16_777_216.0f32);
    }

    #[test]
    fn test_f64_widen_is_identity() {
        let x = 0.1f64;
        assert_eq!(x.widen().to_bits(), x.to_bits());
        assert_eq!(f64::narrow(x).to_bits(), x.to_bits());
    }
}
