//! # Shortest Paths
//!
//! Single-source shortest paths by parallel delta-stepping.
//!
//! Vertices are kept in buckets of width `delta` by tentative distance. Each
//! outer iteration relaxes the current shared bucket in parallel; workers then
//! keep relaxing their own copy of that bucket while it stays small, after
//! which the smallest non-empty bucket across all workers becomes the next
//! shared bucket.
//!
//! ```ignore
//! let paths = ShortestPaths::new(1.0f32)
//!     .source(0)
//!     .optional_results(OptionalResults::DISTANCES | OptionalResults::PREDECESSORS)
//!     .compute(&graph)?;
//! let route = paths.path_to(5)?;
//! ```

use std::ops::{BitOr, BitOrAssign};

use anyhow::bail;
use log::info;
use ndarray::Array1;
use rayon::prelude::*;

use crate::policy::Compute;
use crate::topology::{VertexId, WeightedTopology};
use crate::GraphError;

mod buckets;
mod delta_stepping;
mod weight;

pub use delta_stepping::{delta_stepping, MAX_ELEMENTS_IN_BIN, NO_PREDECESSOR};
pub use weight::EdgeWeight;

/// Set of outputs a shortest-path run should materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalResults(u8);

impl OptionalResults {
    pub const NONE: OptionalResults = OptionalResults(0);
    pub const DISTANCES: OptionalResults = OptionalResults(1);
    pub const PREDECESSORS: OptionalResults = OptionalResults(1 << 1);

    pub fn contains(self, other: OptionalResults) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for OptionalResults {
    fn default() -> Self {
        OptionalResults::DISTANCES
    }
}

impl BitOr for OptionalResults {
    type Output = OptionalResults;

    fn bitor(self, rhs: Self) -> Self::Output {
        OptionalResults(self.0 | rhs.0)
    }
}

impl BitOrAssign for OptionalResults {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShortestPaths<W> {
    source: i64,
    delta: W,
    optional_results: OptionalResults,
}

impl<W: EdgeWeight> ShortestPaths<W> {
    /// Source 0, distances only.
    pub fn new(delta: W) -> Self {
        ShortestPaths {
            source: 0,
            delta,
            optional_results: OptionalResults::default(),
        }
    }

    pub fn source(mut self, source: i64) -> Self {
        self.source = source;
        self
    }

    pub fn delta(mut self, delta: W) -> Self {
        self.delta = delta;
        self
    }

    pub fn optional_results(mut self, optional_results: OptionalResults) -> Self {
        self.optional_results = optional_results;
        self
    }

    fn validate(&self, graph: &WeightedTopology<W>) -> anyhow::Result<VertexId> {
        let vertex_count = graph.topology().vertex_count();
        if self.source < 0 {
            bail!(GraphError::NegativeSourceVertex(self.source));
        }
        if self.source as u64 >= vertex_count as u64 {
            bail!(GraphError::SourceVertexOutOfRange {
                source_vertex: self.source,
                vertex_count,
            });
        }
        if !(self.delta > W::zero()) {
            bail!(GraphError::NonPositiveDelta);
        }
        if self.optional_results.is_empty() {
            bail!(GraphError::NoOptionalResults);
        }

        let values = graph.values();
        if let Some(position) = values.par_iter().position_any(|w| !(*w >= W::zero())) {
            let offsets = graph.topology().row_offsets();
            let from = offsets.partition_point(|&offset| offset <= position) - 1;
            let to = graph.topology().col_indices()[position];
            bail!(GraphError::NegativeEdgeWeight(from as VertexId, to));
        }
        Ok(self.source as VertexId)
    }
}

#[derive(Debug, Clone)]
pub struct ShortestPathsResult<W> {
    source: VertexId,
    distances: Option<Array1<W>>,
    predecessors: Option<Array1<i32>>,
}

impl<W: EdgeWeight> ShortestPathsResult<W> {
    /// Distance of every vertex from the source; unreachable ones hold `W::infinity()`.
    pub fn distances(&self) -> anyhow::Result<&Array1<W>> {
        self.distances
            .as_ref()
            .ok_or_else(|| GraphError::UninitializedOptionalResult("distances").into())
    }

    /// Predecessor on a shortest path, `-1` for the source and unreachable vertices.
    pub fn predecessors(&self) -> anyhow::Result<&Array1<i32>> {
        self.predecessors
            .as_ref()
            .ok_or_else(|| GraphError::UninitializedOptionalResult("predecessors").into())
    }

    /// Vertices from the source to `target`, or `None` if `target` is unreachable.
    ///
    /// Needs predecessors to have been requested.
    pub fn path_to(&self, target: VertexId) -> anyhow::Result<Option<Vec<VertexId>>> {
        let predecessors = self.predecessors()?;
        if target as usize >= predecessors.len() {
            bail!(GraphError::InvalidArgument(format!(
                "Vertex {} is out of range for a graph with {} vertices",
                target,
                predecessors.len()
            )));
        }

        let mut path = vec![target];
        let mut current = target;
        while current != self.source {
            let previous = predecessors[current as usize];
            if previous < 0 || path.len() > predecessors.len() {
                return Ok(None);
            }
            current = previous as VertexId;
            path.push(current);
        }
        path.reverse();
        Ok(Some(path))
    }
}

impl<W: EdgeWeight> Compute<WeightedTopology<W>> for ShortestPaths<W> {
    type Output = ShortestPathsResult<W>;

    fn compute(&self, graph: &WeightedTopology<W>) -> anyhow::Result<ShortestPathsResult<W>> {
        let source = self.validate(graph)?;
        let (distances, predecessors) = delta_stepping(graph, source, self.delta);

        let reached = distances
            .par_iter()
            .filter(|d| **d < W::infinity())
            .count();
        info!(
            "Shortest paths from {} reached {} of {} vertices",
            source,
            reached,
            distances.len()
        );

        let distances = self
            .optional_results
            .contains(OptionalResults::DISTANCES)
            .then(|| Array1::from_vec(distances));
        let predecessors = self
            .optional_results
            .contains(OptionalResults::PREDECESSORS)
            .then(|| {
                predecessors
                    .par_iter()
                    .map(|&p| if p == NO_PREDECESSOR { -1 } else { p as i32 })
                    .collect::<Vec<i32>>()
            })
            .map(Array1::from_vec);

        Ok(ShortestPathsResult {
            source,
            distances,
            predecessors,
        })
    }
}
