//! # Sorted-set intersection
//!
//! Counts the common elements of two ascending vertex lists. This is the inner
//! loop of Jaccard similarity and triangle counting.
//!
//! | Kernel | Lanes | Detection |
//! |--------|-------|-----------|
//! | `Avx512` | 16 | `avx512f` at runtime |
//! | `Avx2` | 8 | `avx2` at runtime |
//! | `Sse2` | 4 | `sse2` at runtime |
//! | `Scalar` | 1 | always |
//!
//! The best kernel is picked once per process and used by [`intersection`].
//! Every kernel returns exactly the same count.

use std::sync::OnceLock;

use log::debug;

use crate::topology::VertexId;

pub mod scalar;
#[cfg(target_arch = "x86_64")]
mod x86;

type IntersectionFn = fn(&[VertexId], &[VertexId]) -> usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntersectionKernel {
    Scalar,
    Sse2,
    Avx2,
    Avx512,
}

static DISPATCH: OnceLock<(IntersectionKernel, IntersectionFn)> = OnceLock::new();

impl IntersectionKernel {
    pub const ALL: [IntersectionKernel; 4] = [
        IntersectionKernel::Scalar,
        IntersectionKernel::Sse2,
        IntersectionKernel::Avx2,
        IntersectionKernel::Avx512,
    ];

    /// The kernel used by [`intersection`]; detected on first use.
    pub fn detect() -> Self {
        dispatch().0
    }

    pub fn is_supported(self) -> bool {
        match self {
            IntersectionKernel::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Sse2 => is_x86_feature_detected!("sse2"),
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Avx512 => is_x86_feature_detected!("avx512f"),
            #[cfg(not(target_arch = "x86_64"))]
            _ => false,
        }
    }

    pub fn supported() -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|kernel| kernel.is_supported())
            .collect()
    }

    pub fn lane_count(self) -> usize {
        match self {
            IntersectionKernel::Scalar => 1,
            IntersectionKernel::Sse2 => 4,
            IntersectionKernel::Avx2 => 8,
            IntersectionKernel::Avx512 => 16,
        }
    }

    /// Runs this specific kernel, falling back to scalar if the CPU lacks it.
    pub fn intersect(self, a: &[VertexId], b: &[VertexId]) -> usize {
        match self.function() {
            Some(kernel) => kernel(a, b),
            None => scalar::intersection(a, b),
        }
    }

    fn function(self) -> Option<IntersectionFn> {
        if !self.is_supported() {
            return None;
        }
        match self {
            IntersectionKernel::Scalar => Some(scalar::intersection),
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Sse2 => Some(x86::sse2),
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Avx2 => Some(x86::avx2),
            #[cfg(target_arch = "x86_64")]
            IntersectionKernel::Avx512 => Some(x86::avx512),
            #[cfg(not(target_arch = "x86_64"))]
            _ => None,
        }
    }
}

fn dispatch() -> &'static (IntersectionKernel, IntersectionFn) {
    DISPATCH.get_or_init(|| {
        let (kernel, function) = IntersectionKernel::ALL
            .into_iter()
            .rev()
            .find_map(|kernel| kernel.function().map(|f| (kernel, f)))
            .unwrap_or((IntersectionKernel::Scalar, scalar::intersection as IntersectionFn));
        debug!("Selected {:?} intersection kernel", kernel);
        (kernel, function)
    })
}

/// Number of common elements of two ascending lists, using the detected kernel.
#[inline]
pub fn intersection(a: &[VertexId], b: &[VertexId]) -> usize {
    (dispatch().1)(a, b)
}

/// Cheap check on list extrema; true when the lists cannot share an element.
#[inline]
pub fn ranges_disjoint(a: &[VertexId], b: &[VertexId]) -> bool {
    match (a.first(), a.last(), b.first(), b.last()) {
        (Some(&a_first), Some(&a_last), Some(&b_first), Some(&b_last)) => {
            a_last < b_first || b_last < a_first
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_sorted(rng: &mut ChaCha8Rng, len: usize, universe: u32) -> Vec<u32> {
        let mut values: Vec<u32> = (0..len).map(|_| rng.random_range(0..universe)).collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    #[test]
    fn test_kernels_agree_with_scalar() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let kernels = IntersectionKernel::supported();
        assert!(kernels.contains(&IntersectionKernel::Scalar));

        for _ in 0..500 {
            let universe = rng.random_range(1..3000);
            let len_a = rng.random_range(0..1000);
            let len_b = rng.random_range(0..1000);
            let a = random_sorted(&mut rng, len_a, universe);
            let b = random_sorted(&mut rng, len_b, universe);
            let expected = scalar::intersection(&a, &b);
            for &kernel in &kernels {
                assert_eq!(kernel.intersect(&a, &b), expected, "kernel {:?}", kernel);
                assert_eq!(kernel.intersect(&b, &a), expected, "kernel {:?}", kernel);
            }
            assert_eq!(intersection(&a, &b), expected);
        }
    }

    #[test]
    fn test_block_boundaries() {
        // Lengths around every lane width so both the vector loop and the tail run.
        for len in 0..40u32 {
            let a: Vec<u32> = (0..len).collect();
            let b: Vec<u32> = (0..len).filter(|x| x % 2 == 0).collect();
            for kernel in IntersectionKernel::supported() {
                assert_eq!(kernel.intersect(&a, &b), b.len());
                assert_eq!(kernel.intersect(&a, &a), a.len());
            }
        }
    }

    #[test]
    fn test_detected_kernel_is_stable() {
        let first = IntersectionKernel::detect();
        assert!(first.is_supported());
        assert_eq!(IntersectionKernel::detect(), first);
    }

    #[test]
    fn test_unsupported_kernel_falls_back() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17];
        for kernel in IntersectionKernel::ALL {
            assert_eq!(kernel.intersect(&a, &a), a.len());
        }
    }

    #[test]
    fn test_ranges_disjoint() {
        assert!(ranges_disjoint(&[1, 2], &[3, 4]));
        assert!(ranges_disjoint(&[], &[3, 4]));
        assert!(!ranges_disjoint(&[1, 5], &[3, 4]));
    }
}
