//! # Triangle Counting
//!
//! Global and per-vertex triangle counts on undirected topologies.
//!
//! Dense graphs (average degree above [`AVERAGE_DEGREE_SPARSITY_BOUNDARY`]) are
//! relabeled by descending degree when relabeling is enabled and then counted
//! with the detected SIMD intersection kernel. Sparse graphs are counted on
//! their original labels with the scalar kernel.
//!
//! Each triangle `w < v < u` is counted once, at the pair `(u, v)`, by
//! intersecting the parts of `N(u)` and `N(v)` below `v`. Counts are unchecked
//! 64-bit sums.

use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::bail;
use log::{debug, info};
use ndarray::Array1;
use rayon::prelude::*;

use crate::intersection::{self, scalar};
use crate::policy::Compute;
use crate::topology::{Topology, VertexId};
use crate::GraphError;

mod relabel;

pub use relabel::{relabel_by_descending_degree, RelabeledTopology};

pub const AVERAGE_DEGREE_SPARSITY_BOUNDARY: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriangleCountingTask {
    #[default]
    Global,
    Local,
    LocalAndGlobal,
}

impl TriangleCountingTask {
    fn wants_global(self) -> bool {
        matches!(self, TriangleCountingTask::Global | TriangleCountingTask::LocalAndGlobal)
    }

    fn wants_local(self) -> bool {
        matches!(self, TriangleCountingTask::Local | TriangleCountingTask::LocalAndGlobal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relabel {
    #[default]
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TriangleCounting {
    task: TriangleCountingTask,
    relabel: Relabel,
}

impl TriangleCounting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, task: TriangleCountingTask) -> Self {
        self.task = task;
        self
    }

    pub fn relabel(mut self, relabel: Relabel) -> Self {
        self.relabel = relabel;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TriangleCountingResult {
    global_count: Option<i64>,
    local_counts: Option<Array1<i64>>,
}

impl TriangleCountingResult {
    pub fn global_count(&self) -> anyhow::Result<i64> {
        self.global_count
            .ok_or_else(|| GraphError::UninitializedOptionalResult("global_count").into())
    }

    pub fn local_counts(&self) -> anyhow::Result<&Array1<i64>> {
        self.local_counts
            .as_ref()
            .ok_or_else(|| GraphError::UninitializedOptionalResult("local_counts").into())
    }
}

/// Neighbors of `vertex` with ids strictly below `bound`.
#[inline]
fn neighbors_below(topology: &Topology, vertex: VertexId, bound: VertexId) -> &[VertexId] {
    let list = topology.neighbors(vertex);
    &list[..list.partition_point(|&x| x < bound)]
}

/// Global triangle count with the given intersection kernel.
pub fn count_global<F>(topology: &Topology, kernel: F) -> u64
where
    F: Fn(&[VertexId], &[VertexId]) -> usize + Sync,
{
    (0..topology.vertex_count())
        .into_par_iter()
        .map(|u| {
            let u = u as VertexId;
            let lower_u = neighbors_below(topology, u, u);
            let mut triangles = 0u64;
            for (k, &v) in lower_u.iter().enumerate() {
                // lower_u is sorted, so its elements below v are exactly lower_u[..k]
                let lower_v = neighbors_below(topology, v, v);
                triangles += kernel(&lower_u[..k], lower_v) as u64;
            }
            triangles
        })
        .sum()
}

/// Per-vertex triangle participation; also returns the global count.
pub fn count_local(topology: &Topology) -> (u64, Vec<i64>) {
    let counters: Vec<AtomicI64> = (0..topology.vertex_count())
        .map(|_| AtomicI64::new(0))
        .collect();

    let total: u64 = (0..topology.vertex_count())
        .into_par_iter()
        .map(|u| {
            let u = u as VertexId;
            let lower_u = neighbors_below(topology, u, u);
            let mut at_u = 0i64;
            for (k, &v) in lower_u.iter().enumerate() {
                let lower_v = neighbors_below(topology, v, v);
                let mut at_v = 0i64;
                scalar::for_each_common(&lower_u[..k], lower_v, |w| {
                    counters[w as usize].fetch_add(1, Ordering::Relaxed);
                    at_v += 1;
                });
                if at_v > 0 {
                    counters[v as usize].fetch_add(at_v, Ordering::Relaxed);
                    at_u += at_v;
                }
            }
            if at_u > 0 {
                counters[u as usize].fetch_add(at_u, Ordering::Relaxed);
            }
            at_u as u64
        })
        .sum();

    let local = counters.into_iter().map(AtomicI64::into_inner).collect();
    (total, local)
}

impl Compute<Topology> for TriangleCounting {
    type Output = TriangleCountingResult;

    fn compute(&self, topology: &Topology) -> anyhow::Result<TriangleCountingResult> {
        if topology.is_directed() {
            bail!(GraphError::DirectedGraphNotSupported);
        }

        let average_degree = topology.average_degree();
        let relabeled = if self.relabel == Relabel::Yes
            && average_degree > AVERAGE_DEGREE_SPARSITY_BOUNDARY
        {
            debug!(
                "Average degree {:.2} above sparsity boundary, relabeling by degree",
                average_degree
            );
            Some(relabel_by_descending_degree(topology))
        } else {
            None
        };
        let working = relabeled.as_ref().map_or(topology, |r| &r.topology);

        let (global, local) = if self.task.wants_local() {
            let (total, local) = count_local(working);
            let local = match &relabeled {
                Some(r) => {
                    let mut original = vec![0i64; local.len()];
                    for (new_id, &count) in local.iter().enumerate() {
                        original[r.new_to_old[new_id] as usize] = count;
                    }
                    original
                }
                None => local,
            };
            (total, Some(Array1::from_vec(local)))
        } else if relabeled.is_some() {
            debug!(
                "Counting with {:?} kernel",
                intersection::IntersectionKernel::detect()
            );
            (count_global(working, intersection::intersection), None)
        } else {
            debug!("Counting with scalar kernel");
            (count_global(working, scalar::intersection), None)
        };

        info!("Counted {} triangles", global);
        Ok(TriangleCountingResult {
            global_count: self.task.wants_global().then_some(global as i64),
            local_counts: local,
        })
    }
}
