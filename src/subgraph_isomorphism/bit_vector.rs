use crate::topology::VertexId;

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-capacity bitset over vertex ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

#[inline]
fn word_count(len: usize) -> usize {
    len.div_ceil(WORD_BITS)
}

impl BitVector {
    pub fn new(len: usize) -> Self {
        BitVector {
            words: vec![0; word_count(len)],
            len,
        }
    }

    /// A vector with every bit in `0..len` set.
    pub fn full(len: usize) -> Self {
        let mut bits = BitVector {
            words: vec![u64::MAX; word_count(len)],
            len,
        };
        bits.clear_tail();
        bits
    }

    pub fn from_indices(len: usize, indices: &[VertexId]) -> Self {
        let mut bits = Self::new(len);
        for &index in indices {
            bits.set(index);
        }
        bits
    }

    fn clear_tail(&mut self) {
        let used = self.len % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: VertexId) -> bool {
        let index = index as usize;
        debug_assert!(index < self.len);
        self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    #[inline]
    pub fn set(&mut self, index: VertexId) {
        let index = index as usize;
        debug_assert!(index < self.len);
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    #[inline]
    pub fn unset(&mut self, index: VertexId) {
        let index = index as usize;
        debug_assert!(index < self.len);
        self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
    }

    pub fn and_assign(&mut self, other: &BitVector) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    pub fn or_assign(&mut self, other: &BitVector) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    /// `self &= !other`
    pub fn and_not_assign(&mut self, other: &BitVector) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !*b;
        }
    }

    /// Overwrites the contents with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &BitVector) {
        self.words.clear();
        self.words.extend_from_slice(&other.words);
        self.len = other.len;
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn none(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn min_index(&self) -> Option<VertexId> {
        self.words
            .iter()
            .enumerate()
            .find(|&(_, &w)| w != 0)
            .map(|(i, w)| (i * WORD_BITS + w.trailing_zeros() as usize) as VertexId)
    }

    pub fn max_index(&self) -> Option<VertexId> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &w)| w != 0)
            .map(|(i, w)| (i * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize)) as VertexId)
    }

    /// Keeps only the set bits for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(VertexId) -> bool,
    {
        for (i, word) in self.words.iter_mut().enumerate() {
            let mut rest = *word;
            while rest != 0 {
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                if !keep((i * WORD_BITS + bit) as VertexId) {
                    *word &= !(1u64 << bit);
                }
            }
        }
    }

    /// Set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((i * WORD_BITS + bit) as VertexId)
            })
        })
    }
}
