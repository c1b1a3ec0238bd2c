use crate::float_trait::Float;

use ndarray::Array1;
use std::cmp::Ordering;
use std::ops::Deref;

// Underlying array is guaranteed to be sorted and contiguous
#[derive(Clone, Debug, PartialEq)]
pub struct SortedArray<T>(pub Array1<T>);

impl<T> SortedArray<T>
where
    T: Float,
{
    pub fn median(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let i = (self.len() - 1) / 2;
        if self.len() % 2 == 0 {
            Some(T::from_f64_lossy(0.5) * (self[i] + self[i + 1]))
        } else {
            Some(self[i])
        }
    }
}

impl<T> From<Vec<T>> for SortedArray<T>
where
    T: Float,
{
    fn from(mut v: Vec<T>) -> Self {
        // NaNs go last, so they never hide a finite median in a mostly finite array
        v[..].sort_unstable_by(|a, b| match (a.is_nan(), b.is_nan()) {
            (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        });
        Self(Array1::from_vec(v))
    }
}

impl<T> Deref for SortedArray<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        // Constructed from Vec only, so the layout is standard
        self.0.as_slice().unwrap_or(&[])
    }
}
