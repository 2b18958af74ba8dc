use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use super::bit_vector::BitVector;
use super::sorter::MatchingOrder;
use super::storage::TargetStorage;
use super::{AttributedGraph, MatchKind};
use crate::topology::VertexId;

/// Shared state of one matching run.
pub(crate) struct Engine<'a> {
    target: &'a AttributedGraph,
    pattern: &'a AttributedGraph,
    storage: &'a TargetStorage<'a>,
    order: &'a MatchingOrder,
    kind: MatchKind,
    limit: Option<usize>,
    domains: Vec<BitVector>,
    found: AtomicUsize,
    stop: AtomicBool,
    matches: Mutex<Vec<Vec<i32>>>,
}

/// Per-worker scratch: the partial mapping and one candidate set per depth.
struct SearchState {
    mapping: Vec<VertexId>,
    used: BitVector,
    levels: Vec<BitVector>,
    kept: Vec<VertexId>,
}

impl SearchState {
    fn new(target_size: usize, depth: usize) -> Self {
        SearchState {
            mapping: vec![0; depth],
            used: BitVector::new(target_size),
            levels: (0..depth).map(|_| BitVector::new(target_size)).collect(),
            kept: Vec::new(),
        }
    }
}

impl<'a> Engine<'a> {
    pub fn new(
        target: &'a AttributedGraph,
        pattern: &'a AttributedGraph,
        storage: &'a TargetStorage<'a>,
        order: &'a MatchingOrder,
        kind: MatchKind,
        limit: Option<usize>,
    ) -> Self {
        let domains = order
            .order
            .par_iter()
            .map(|&p| Self::domain(target, pattern, p))
            .collect();
        Engine {
            target,
            pattern,
            storage,
            order,
            kind,
            limit,
            domains,
            found: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            matches: Mutex::new(Vec::new()),
        }
    }

    /// Target vertices that can host pattern vertex `p` on their own.
    fn domain(target: &AttributedGraph, pattern: &AttributedGraph, p: VertexId) -> BitVector {
        let n = target.topology().vertex_count();
        let required = pattern.topology().degree(p);
        let wanted = pattern.vertex_attribute(p);
        let mut domain = BitVector::full(n);
        domain.retain(|t| {
            target.topology().degree(t) >= required
                && match (wanted, target.vertex_attribute(t)) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        });
        domain
    }

    /// Runs the search; returns the matches found, one row per match indexed
    /// by pattern vertex id.
    pub fn run(self) -> Vec<Vec<i32>> {
        if self.domains.iter().any(BitVector::none) {
            return Vec::new();
        }

        let n = self.target.topology().vertex_count();
        let roots: Vec<VertexId> = self.domains[0].iter_ones().collect();
        roots.par_iter().for_each_init(
            || SearchState::new(n, self.order.len()),
            |state, &root| {
                if self.stop.load(Ordering::Relaxed) {
                    return;
                }
                state.mapping[0] = root;
                state.used.set(root);
                self.extend(state, 1);
                state.used.unset(root);
            },
        );

        self.matches.into_inner()
    }

    fn extend(&self, state: &mut SearchState, depth: usize) {
        if self.stop.load(Ordering::Relaxed) {
            return;
        }
        if depth == self.order.len() {
            self.record(&state.mapping);
            return;
        }

        let mut candidates = std::mem::take(&mut state.levels[depth]);
        candidates.copy_from(&self.domains[depth]);
        candidates.and_not_assign(&state.used);
        for &q in &self.order.linked[depth] {
            self.storage
                .keep_neighbors(state.mapping[q], &mut candidates, &mut state.kept);
        }
        if self.kind == MatchKind::Induced {
            for &q in &self.order.unlinked[depth] {
                self.storage.drop_neighbors(state.mapping[q], &mut candidates);
            }
        }

        let p = self.order.order[depth];
        for t in candidates.iter_ones() {
            if !self.edge_attributes_agree(state, depth, p, t) {
                continue;
            }
            state.mapping[depth] = t;
            state.used.set(t);
            self.extend(state, depth + 1);
            state.used.unset(t);
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        state.levels[depth] = candidates;
    }

    fn edge_attributes_agree(&self, state: &SearchState, depth: usize, p: VertexId, t: VertexId) -> bool {
        if !(self.pattern.has_edge_attributes() && self.target.has_edge_attributes()) {
            return true;
        }
        self.order.linked[depth].iter().all(|&q| {
            let pattern_value = self.pattern.edge_attribute(p, self.order.order[q]);
            let target_value = self.target.edge_attribute(t, state.mapping[q]);
            pattern_value == target_value
        })
    }

    fn record(&self, mapping: &[VertexId]) {
        let index = self.found.fetch_add(1, Ordering::AcqRel);
        if let Some(limit) = self.limit {
            if index >= limit {
                self.stop.store(true, Ordering::Relaxed);
                return;
            }
            if index + 1 == limit {
                self.stop.store(true, Ordering::Relaxed);
            }
        }

        let mut row = vec![0i32; mapping.len()];
        for (position, &t) in mapping.iter().enumerate() {
            row[self.order.order[position] as usize] = t as i32;
        }
        self.matches.lock().push(row);
    }
}
