//! # CSR Topology
//!
//! Immutable compressed-sparse-row adjacency shared by every graph algorithm in
//! the crate. Neighbor lists are strictly ascending per vertex, which is what
//! the merge-style intersection kernels rely on.

use anyhow::bail;
use rayon::prelude::*;

use crate::GraphError;

mod builder;

pub use builder::{topology_from_matrix, topology_from_petgraph, weighted_topology_from_petgraph};
pub use builder::TopologyBuilder;

pub type VertexId = u32;

/// Largest vertex count a topology may hold; ids must fit signed 32-bit output columns.
pub const MAX_VERTEX_COUNT: usize = i32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    Undirected,
    Directed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    kind: GraphKind,
    edge_count: usize,
    row_offsets: Vec<usize>,
    neighbors: Vec<VertexId>,
    degrees: Vec<u32>,
}

impl Topology {
    /// Builds a topology from raw CSR arrays, checking every invariant first.
    pub fn from_parts(
        kind: GraphKind,
        row_offsets: Vec<usize>,
        neighbors: Vec<VertexId>,
    ) -> anyhow::Result<Self> {
        let topology = Self::from_sorted_parts(kind, row_offsets, neighbors);
        topology.validate()?;
        Ok(topology)
    }

    /// Internal constructor for arrays already known to satisfy the CSR invariants.
    pub(crate) fn from_sorted_parts(
        kind: GraphKind,
        row_offsets: Vec<usize>,
        neighbors: Vec<VertexId>,
    ) -> Self {
        let degrees = if row_offsets.is_empty() {
            Vec::new()
        } else {
            row_offsets
                .par_windows(2)
                .map(|window| (window[1].saturating_sub(window[0])) as u32)
                .collect()
        };
        let edge_count = match kind {
            GraphKind::Undirected => neighbors.len() / 2,
            GraphKind::Directed => neighbors.len(),
        };
        Topology {
            kind,
            edge_count,
            row_offsets,
            neighbors,
            degrees,
        }
    }

    pub fn empty(kind: GraphKind) -> Self {
        Self::from_sorted_parts(kind, vec![0], Vec::new())
    }

    #[inline]
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    #[inline]
    pub fn is_directed(&self) -> bool {
        self.kind == GraphKind::Directed
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.degrees.len()
    }

    /// Unique undirected edges for undirected graphs, arcs for directed ones.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// The flat neighbor array partitioned by `row_offsets`.
    #[inline]
    pub fn col_indices(&self) -> &[VertexId] {
        &self.neighbors
    }

    #[inline]
    pub fn degrees(&self) -> &[u32] {
        &self.degrees
    }

    #[inline]
    pub fn degree(&self, vertex: VertexId) -> usize {
        self.degrees[vertex as usize] as usize
    }

    #[inline]
    pub fn neighbors(&self, vertex: VertexId) -> &[VertexId] {
        let v = vertex as usize;
        &self.neighbors[self.row_offsets[v]..self.row_offsets[v + 1]]
    }

    /// Binary search in the sorted neighbor list of `from`.
    #[inline]
    pub fn has_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.neighbors(from).binary_search(&to).is_ok()
    }

    pub fn average_degree(&self) -> f64 {
        if self.vertex_count() == 0 {
            return 0.0;
        }
        self.edge_count as f64 / self.vertex_count() as f64
    }

    pub fn max_degree(&self) -> usize {
        self.degrees.par_iter().copied().max().unwrap_or(0) as usize
    }

    /// Checks offsets, sorted neighbor slices, id ranges and degree consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        let n = self.vertex_count();
        if self.row_offsets.len() != n + 1 {
            bail!(GraphError::InvalidArgument(format!(
                "Row offsets have length {} but {} were expected",
                self.row_offsets.len(),
                n + 1
            )));
        }
        if n > MAX_VERTEX_COUNT {
            bail!(GraphError::InvalidArgument(format!(
                "Vertex count {} exceeds the supported maximum {}",
                n, MAX_VERTEX_COUNT
            )));
        }
        if self.row_offsets[0] != 0 || self.row_offsets[n] != self.neighbors.len() {
            bail!(GraphError::InvalidArgument(
                "Row offsets must start at zero and end at the neighbor count".to_string()
            ));
        }
        if self.row_offsets.windows(2).any(|w| w[0] > w[1]) {
            bail!(GraphError::InvalidArgument(
                "Row offsets must be non-decreasing".to_string()
            ));
        }

        let bad_vertex = (0..n).into_par_iter().find_any(|&v| {
            let slice = &self.neighbors[self.row_offsets[v]..self.row_offsets[v + 1]];
            slice.windows(2).any(|w| w[0] >= w[1])
                || slice.last().is_some_and(|&last| last as usize >= n)
                || self.degrees[v] as usize != slice.len()
        });
        if let Some(v) = bad_vertex {
            bail!(GraphError::InvalidArgument(format!(
                "Neighbor list of vertex {} is not strictly ascending, out of range or inconsistent with its degree",
                v
            )));
        }

        if self.kind == GraphKind::Undirected {
            let asymmetric = (0..n).into_par_iter().find_any(|&v| {
                self.neighbors(v as VertexId)
                    .iter()
                    .any(|&u| !self.has_edge(u, v as VertexId))
            });
            if let Some(v) = asymmetric {
                bail!(GraphError::InvalidArgument(format!(
                    "Undirected topology is not symmetric around vertex {}",
                    v
                )));
            }
        }
        Ok(())
    }
}

/// A topology with one value per stored edge, aligned with `col_indices`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTopology<W> {
    topology: Topology,
    values: Vec<W>,
}

impl<W> WeightedTopology<W> {
    pub fn new(topology: Topology, values: Vec<W>) -> anyhow::Result<Self> {
        if values.len() != topology.col_indices().len() {
            bail!(GraphError::InvalidArgument(format!(
                "Edge value array has length {} but the topology stores {} edges",
                values.len(),
                topology.col_indices().len()
            )));
        }
        Ok(WeightedTopology { topology, values })
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    pub fn values(&self) -> &[W] {
        &self.values
    }

    #[inline]
    pub fn edge_values(&self, vertex: VertexId) -> &[W] {
        let v = vertex as usize;
        let offsets = self.topology.row_offsets();
        &self.values[offsets[v]..offsets[v + 1]]
    }

    pub fn edges(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, &W)> + '_ {
        self.topology
            .neighbors(vertex)
            .iter()
            .copied()
            .zip(self.edge_values(vertex).iter())
    }

    /// Value stored on edge `from -> to`, if the edge exists.
    pub fn edge_value(&self, from: VertexId, to: VertexId) -> Option<&W> {
        self.topology
            .neighbors(from)
            .binary_search(&to)
            .ok()
            .map(|pos| &self.edge_values(from)[pos])
    }

    pub fn into_parts(self) -> (Topology, Vec<W>) {
        (self.topology, self.values)
    }
}
