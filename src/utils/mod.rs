use rayon::prelude::*;

/// Block length for the parallel prefix sum.
pub const PREFIX_SUM_BLOCK: usize = 4096;

pub trait ZeroVec {
    fn zero_len(&mut self, len: usize);
}

impl<T: Default + Clone> ZeroVec for Vec<T> {
    fn zero_len(&mut self, len: usize) {
        self.clear();
        self.reserve(len);
        self.extend(std::iter::repeat_n(T::default(), len));
    }
}

/// Offsets array of length `counts.len() + 1`, computed block by block in parallel.
pub fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::new();
    offsets.zero_len(counts.len() + 1);

    let block_totals: Vec<usize> = counts
        .par_chunks(PREFIX_SUM_BLOCK)
        .map(|block| block.iter().sum())
        .collect();

    let mut block_starts = Vec::with_capacity(block_totals.len());
    let mut running = 0usize;
    for total in block_totals {
        block_starts.push(running);
        running += total;
    }

    offsets[1..]
        .par_chunks_mut(PREFIX_SUM_BLOCK)
        .zip(counts.par_chunks(PREFIX_SUM_BLOCK))
        .zip(block_starts.par_iter())
        .for_each(|((dst, src), &start)| {
            let mut acc = start;
            for (out, &count) in dst.iter_mut().zip(src) {
                acc += count;
                *out = acc;
            }
        });
    offsets
}

/// Splits `data` into consecutive disjoint slices delimited by `offsets`.
///
/// `offsets` must be non-decreasing, start at zero and end at `data.len()`.
pub fn split_by_offsets_mut<'a, T>(mut data: &'a mut [T], offsets: &[usize]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(offsets.len().saturating_sub(1));
    for window in offsets.windows(2) {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(window[1] - window[0]);
        parts.push(head);
        data = tail;
    }
    parts
}
