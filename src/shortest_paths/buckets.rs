use std::collections::BTreeMap;

use crate::topology::VertexId;

/// Per-worker bucket storage for delta-stepping.
///
/// Buckets are sparse: only indices that hold vertices have a slot. Slot
/// vectors are recycled through a free list so their capacity survives from one
/// outer iteration to the next.
#[derive(Debug, Default)]
pub(crate) struct BucketArena {
    slots: Vec<Vec<VertexId>>,
    index: BTreeMap<usize, usize>,
    free: Vec<usize>,
    scratch: Vec<VertexId>,
}

impl BucketArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: usize, vertex: VertexId) {
        let slot = match self.index.get(&bucket) {
            Some(&slot) => slot,
            None => {
                let slot = match self.free.pop() {
                    Some(slot) => slot,
                    None => {
                        self.slots.push(Vec::new());
                        self.slots.len() - 1
                    }
                };
                self.index.insert(bucket, slot);
                slot
            }
        };
        self.slots[slot].push(vertex);
    }

    pub fn len_of(&self, bucket: usize) -> usize {
        self.index
            .get(&bucket)
            .map_or(0, |&slot| self.slots[slot].len())
    }

    pub fn min_bucket(&self) -> Option<usize> {
        self.index.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Moves the contents of `bucket` into `out` (which must be empty).
    pub fn take_bucket(&mut self, bucket: usize, out: &mut Vec<VertexId>) {
        debug_assert!(out.is_empty());
        if let Some(slot) = self.index.remove(&bucket) {
            std::mem::swap(&mut self.slots[slot], out);
            self.free.push(slot);
        }
    }

    /// Copies `bucket` into `dst` (sized by `len_of`) and releases the slot.
    pub fn drain_into(&mut self, bucket: usize, dst: &mut [VertexId]) {
        if let Some(slot) = self.index.remove(&bucket) {
            dst.copy_from_slice(&self.slots[slot]);
            self.slots[slot].clear();
            self.free.push(slot);
        }
    }

    pub fn take_scratch(&mut self) -> Vec<VertexId> {
        std::mem::take(&mut self.scratch)
    }

    pub fn return_scratch(&mut self, mut scratch: Vec<VertexId>) {
        scratch.clear();
        self.scratch = scratch;
    }
}
