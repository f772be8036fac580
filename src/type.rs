use std::fmt::Debug;

use geo_traits::CoordTrait;
use num_traits::Float;
use tinyvec::TinyVec;

/// A trait for types that can be used for indexed coordinates.
///
/// Distances are Euclidean, so only real (floating point) coordinate types are supported. This
/// trait is sealed and cannot be implemented for external types.
pub trait IndexableNum: private::Sealed + Float + Default + Debug + Send + Sync {}

impl IndexableNum for f32 {}

impl IndexableNum for f64 {}

/// Flatten a geo-traits coordinate into its ordinates, in `x, y, z, m` order.
pub(crate) fn coord_values<N: IndexableNum>(coord: &impl CoordTrait<T = N>) -> TinyVec<[N; 4]> {
    (0..coord.dim().size())
        .map(|n| coord.nth_or_panic(n))
        .collect()
}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
