// SAFETY: the `unsafe fn` kernels here require their target feature to be
// present. They are only reached through `IntersectionKernel`, which checks
// `is_x86_feature_detected!` before handing out the function pointer. Every
// load reads `LANES` elements starting at an index `k` with `k + LANES <= len`.

use std::arch::x86_64::*;

use super::scalar;
use crate::topology::VertexId;

#[inline(always)]
fn advance(a: &[VertexId], b: &[VertexId], i: &mut usize, j: &mut usize, lanes: usize) {
    let a_last = a[*i + lanes - 1];
    let b_last = b[*j + lanes - 1];
    if a_last <= b_last {
        *i += lanes;
    }
    if b_last <= a_last {
        *j += lanes;
    }
}

#[target_feature(enable = "sse2")]
unsafe fn intersection_sse2(a: &[VertexId], b: &[VertexId]) -> usize {
    const LANES: usize = 4;
    let (mut i, mut j) = (0usize, 0usize);
    let mut count = 0usize;

    while i + LANES <= a.len() && j + LANES <= b.len() {
        let va = _mm_loadu_si128(a.as_ptr().add(i) as *const __m128i);
        let vb = _mm_loadu_si128(b.as_ptr().add(j) as *const __m128i);

        let rot1 = _mm_shuffle_epi32::<0b00_11_10_01>(vb);
        let rot2 = _mm_shuffle_epi32::<0b01_00_11_10>(vb);
        let rot3 = _mm_shuffle_epi32::<0b10_01_00_11>(vb);

        let matches = _mm_or_si128(
            _mm_or_si128(_mm_cmpeq_epi32(va, vb), _mm_cmpeq_epi32(va, rot1)),
            _mm_or_si128(_mm_cmpeq_epi32(va, rot2), _mm_cmpeq_epi32(va, rot3)),
        );
        count += (_mm_movemask_ps(_mm_castsi128_ps(matches)) as u32).count_ones() as usize;

        advance(a, b, &mut i, &mut j, LANES);
    }

    count + scalar::intersection(&a[i..], &b[j..])
}

#[target_feature(enable = "avx2")]
unsafe fn intersection_avx2(a: &[VertexId], b: &[VertexId]) -> usize {
    const LANES: usize = 8;
    let lane_ids = _mm256_setr_epi32(0, 1, 2, 3, 4, 5, 6, 7);
    let lane_mask = _mm256_set1_epi32(LANES as i32 - 1);
    let mut rotations = [_mm256_setzero_si256(); LANES];
    for (r, rotation) in rotations.iter_mut().enumerate() {
        *rotation = _mm256_and_si256(_mm256_add_epi32(lane_ids, _mm256_set1_epi32(r as i32)), lane_mask);
    }

    let (mut i, mut j) = (0usize, 0usize);
    let mut count = 0usize;

    while i + LANES <= a.len() && j + LANES <= b.len() {
        let va = _mm256_loadu_si256(a.as_ptr().add(i) as *const __m256i);
        let vb = _mm256_loadu_si256(b.as_ptr().add(j) as *const __m256i);

        let mut matches = _mm256_setzero_si256();
        for rotation in &rotations {
            let rotated = _mm256_permutevar8x32_epi32(vb, *rotation);
            matches = _mm256_or_si256(matches, _mm256_cmpeq_epi32(va, rotated));
        }
        count += (_mm256_movemask_ps(_mm256_castsi256_ps(matches)) as u32).count_ones() as usize;

        advance(a, b, &mut i, &mut j, LANES);
    }

    count + scalar::intersection(&a[i..], &b[j..])
}

#[target_feature(enable = "avx512f")]
unsafe fn intersection_avx512(a: &[VertexId], b: &[VertexId]) -> usize {
    const LANES: usize = 16;
    let ids: [i32; LANES] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    let lane_ids = _mm512_loadu_epi32(ids.as_ptr());
    let lane_mask = _mm512_set1_epi32(LANES as i32 - 1);
    let mut rotations = [_mm512_setzero_si512(); LANES];
    for (r, rotation) in rotations.iter_mut().enumerate() {
        *rotation = _mm512_and_epi32(_mm512_add_epi32(lane_ids, _mm512_set1_epi32(r as i32)), lane_mask);
    }

    let (mut i, mut j) = (0usize, 0usize);
    let mut count = 0usize;

    while i + LANES <= a.len() && j + LANES <= b.len() {
        let va = _mm512_loadu_epi32(a.as_ptr().add(i) as *const i32);
        let vb = _mm512_loadu_epi32(b.as_ptr().add(j) as *const i32);

        let mut matches: __mmask16 = 0;
        for rotation in &rotations {
            let rotated = _mm512_permutexvar_epi32(*rotation, vb);
            matches |= _mm512_cmpeq_epi32_mask(va, rotated);
        }
        count += matches.count_ones() as usize;

        advance(a, b, &mut i, &mut j, LANES);
    }

    count + scalar::intersection(&a[i..], &b[j..])
}

pub(super) fn sse2(a: &[VertexId], b: &[VertexId]) -> usize {
    unsafe { intersection_sse2(a, b) }
}

pub(super) fn avx2(a: &[VertexId], b: &[VertexId]) -> usize {
    unsafe { intersection_avx2(a, b) }
}

pub(super) fn avx512(a: &[VertexId], b: &[VertexId]) -> usize {
    unsafe { intersection_avx512(a, b) }
}
