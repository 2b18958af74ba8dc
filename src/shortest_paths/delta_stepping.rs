use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use rayon::prelude::*;

use super::buckets::BucketArena;
use super::weight::EdgeWeight;
use crate::topology::{VertexId, WeightedTopology};
use crate::utils::{exclusive_prefix_sum, split_by_offsets_mut};

/// A worker keeps relaxing its current bucket locally while the bucket holds
/// fewer vertices than this.
pub const MAX_ELEMENTS_IN_BIN: usize = 1000;

/// Marks an absent predecessor inside a packed path cell.
pub const NO_PREDECESSOR: u32 = u32::MAX;

/// Returned by the next-bucket reduction when every arena is empty.
const NO_BUCKET: usize = usize::MAX;

/// Tentative distance and predecessor of every vertex, one packed word each.
///
/// The high half holds the distance bits, the low half the predecessor, so both
/// change together under a single compare-and-swap.
pub(crate) struct PathState<W> {
    cells: Vec<AtomicU64>,
    _weight: std::marker::PhantomData<W>,
}

#[inline]
fn pack<W: EdgeWeight>(distance: W, predecessor: u32) -> u64 {
    ((distance.to_bits() as u64) << 32) | predecessor as u64
}

#[inline]
fn unpack<W: EdgeWeight>(word: u64) -> (W, u32) {
    (W::from_bits((word >> 32) as u32), word as u32)
}

impl<W: EdgeWeight> PathState<W> {
    pub fn new(vertex_count: usize, source: VertexId) -> Self {
        let unreached = pack(W::infinity(), NO_PREDECESSOR);
        let cells: Vec<AtomicU64> = (0..vertex_count)
            .into_par_iter()
            .map(|_| AtomicU64::new(unreached))
            .collect();
        cells[source as usize].store(pack(W::zero(), NO_PREDECESSOR), Ordering::Relaxed);
        PathState {
            cells,
            _weight: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn load(&self, vertex: VertexId) -> (W, u32) {
        unpack(self.cells[vertex as usize].load(Ordering::Acquire))
    }

    /// Lowers the distance of `vertex` to `candidate` through `via`.
    ///
    /// Returns `true` when this call installed the new value.
    pub fn relax(&self, vertex: VertexId, candidate: W, via: VertexId) -> bool {
        let cell = &self.cells[vertex as usize];
        let mut current = cell.load(Ordering::Acquire);
        loop {
            let (distance, _) = unpack::<W>(current);
            if !(candidate < distance) {
                return false;
            }
            match cell.compare_exchange_weak(
                current,
                pack(candidate, via),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn into_parts(self) -> (Vec<W>, Vec<u32>) {
        self.cells
            .into_par_iter()
            .map(|cell| unpack::<W>(cell.into_inner()))
            .unzip()
    }
}

#[inline]
fn bucket_of<W: EdgeWeight>(distance: W, delta: f64) -> usize {
    let index = distance.to_f64().unwrap_or(f64::INFINITY) / delta;
    // float to int casts saturate, keep one value free for NO_BUCKET
    (index.floor() as usize).min(NO_BUCKET - 1)
}

struct Relaxer<'a, W> {
    graph: &'a WeightedTopology<W>,
    state: &'a PathState<W>,
    delta: f64,
}

impl<W: EdgeWeight> Relaxer<'_, W> {
    fn process(&self, vertex: VertexId, current_bucket: usize, arena: &mut BucketArena) {
        let (distance, _) = self.state.load(vertex);
        if bucket_of(distance, self.delta) < current_bucket {
            // settled in an earlier bucket, this entry is stale
            return;
        }
        for (neighbor, &weight) in self.graph.edges(vertex) {
            let candidate = distance.extend(weight);
            if self.state.relax(neighbor, candidate, vertex) {
                arena.push(bucket_of(candidate, self.delta), neighbor);
            }
        }
    }
}

/// Parallel delta-stepping from `source`.
///
/// Returns the final distances and predecessors (`NO_PREDECESSOR` for the
/// source and for unreachable vertices). Edge weights must be non-negative
/// and `delta` positive; callers validate both.
pub fn delta_stepping<W: EdgeWeight>(
    graph: &WeightedTopology<W>,
    source: VertexId,
    delta: W,
) -> (Vec<W>, Vec<u32>) {
    let vertex_count = graph.topology().vertex_count();
    let delta = delta.to_f64().unwrap_or(1.0);
    let state = PathState::<W>::new(vertex_count, source);
    let relaxer = Relaxer {
        graph,
        state: &state,
        delta,
    };

    let workers = rayon::current_num_threads().max(1);
    let mut arenas: Vec<BucketArena> = (0..workers).map(|_| BucketArena::new()).collect();
    let mut shared_bin: Vec<VertexId> = vec![source];
    let mut current_bucket = 0usize;
    let mut iterations = 0usize;

    debug!(
        "Delta-stepping on {} vertices with delta {} and {} workers",
        vertex_count, delta, workers
    );

    loop {
        iterations += 1;
        let chunk_len = shared_bin.len().div_ceil(workers).max(1);

        shared_bin
            .par_chunks(chunk_len)
            .zip(arenas.par_iter_mut())
            .for_each(|(vertices, arena)| {
                for &vertex in vertices {
                    relaxer.process(vertex, current_bucket, arena);
                }

                let mut scratch = arena.take_scratch();
                loop {
                    let pending = arena.len_of(current_bucket);
                    if pending == 0 || pending >= MAX_ELEMENTS_IN_BIN {
                        break;
                    }
                    arena.take_bucket(current_bucket, &mut scratch);
                    for &vertex in &scratch {
                        relaxer.process(vertex, current_bucket, arena);
                    }
                    scratch.clear();
                }
                arena.return_scratch(scratch);
            });

        let next_bucket = arenas
            .par_iter()
            .map(|arena| arena.min_bucket().unwrap_or(NO_BUCKET))
            .min()
            .unwrap_or(NO_BUCKET);
        if next_bucket == NO_BUCKET {
            break;
        }
        current_bucket = next_bucket;

        let sizes: Vec<usize> = arenas
            .iter()
            .map(|arena| arena.len_of(current_bucket))
            .collect();
        let offsets = exclusive_prefix_sum(&sizes);
        shared_bin.clear();
        shared_bin.resize(offsets[workers], 0);
        trace!(
            "Bucket {} gathers {} vertices",
            current_bucket,
            shared_bin.len()
        );

        split_by_offsets_mut(&mut shared_bin, &offsets)
            .into_par_iter()
            .zip(arenas.par_iter_mut())
            .for_each(|(dst, arena)| arena.drain_into(current_bucket, dst));
    }

    debug_assert!(arenas.iter().all(BucketArena::is_empty));
    debug!(
        "Delta-stepping finished after {} iterations, last bucket {}",
        iterations, current_bucket
    );

    state.into_parts()
}
