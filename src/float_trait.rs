use ndarray::NdFloat;
use num_traits::FloatConst;
use std::iter::Sum;

/// Floating point type accepted by light curve containers
///
/// Fitting itself runs in `f64`, so every implementor converts to and from `f64`.
pub trait Float: 'static + Sized + NdFloat + FloatConst + Sum {
    fn as_f64(self) -> f64;

    fn from_f64_lossy(x: f64) -> Self;
}

macro_rules! float_trait_impl {
    ($t: ty) => {
        impl Float for $t {
            #[inline]
            fn as_f64(self) -> f64 {
                self.into()
            }

            #[inline]
            fn from_f64_lossy(x: f64) -> Self {
                x as $t
            }
        }
    };
}

float_trait_impl!(f32);
float_trait_impl!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_round_trip() {
        let x = 0.25_f32;
        assert_eq!(f32::from_f64_lossy(x.as_f64()), x);
    }

    #[test]
    fn f64_is_lossless() {
        let x = 0.1_f64;
        assert_eq!(f64::from_f64_lossy(x), x);
        assert_eq!(x.as_f64(), x);
    }
}
