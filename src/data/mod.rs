mod light_curve;
pub use light_curve::LightCurve;

mod sorted_array;
pub use sorted_array::SortedArray;
