use std::fmt::Debug;

use num_traits::{One, ToPrimitive, Zero};

/// Edge weight types accepted by the shortest-path solver.
///
/// Weights are 32 bits wide so that a `(distance, predecessor)` pair fits in a
/// single 64-bit atomic.
pub trait EdgeWeight: Copy + PartialOrd + Zero + One + ToPrimitive + Debug + Send + Sync + 'static {
    /// Distance of an unreachable vertex.
    fn infinity() -> Self;

    /// Path extension; integer types saturate at `infinity()`.
    fn extend(self, weight: Self) -> Self;

    fn to_bits(self) -> u32;

    fn from_bits(bits: u32) -> Self;
}

impl EdgeWeight for f32 {
    #[inline]
    fn infinity() -> Self {
        f32::INFINITY
    }

    #[inline]
    fn extend(self, weight: Self) -> Self {
        self + weight
    }

    #[inline]
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }

    #[inline]
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
}

macro_rules! integer_edge_weight {
    ($t:ty) => {
        impl EdgeWeight for $t {
            #[inline]
            fn infinity() -> Self {
                <$t>::MAX
            }

            #[inline]
            fn extend(self, weight: Self) -> Self {
                self.saturating_add(weight)
            }

            #[inline]
            fn to_bits(self) -> u32 {
                self as u32
            }

            #[inline]
            fn from_bits(bits: u32) -> Self {
                bits as $t
            }
        }
    };
}

integer_edge_weight!(i32);
integer_edge_weight!(u32);
