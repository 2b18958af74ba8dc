use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use anyhow::bail;
use nalgebra_sparse::CsrMatrix;
use petgraph::visit::{EdgeRef, GraphProp, IntoEdgeReferences, NodeIndexable};
use rayon::prelude::*;

use super::{GraphKind, Topology, VertexId, WeightedTopology, MAX_VERTEX_COUNT};
use crate::utils::exclusive_prefix_sum;
use crate::GraphError;

/// Builds sorted, deduplicated CSR topologies from edge lists.
///
/// Undirected graphs store each edge in both directions and drop self-loops.
/// Duplicate edges collapse into one; for weighted input the smallest weight wins.
#[derive(Debug, Clone, Copy)]
pub struct TopologyBuilder {
    vertex_count: usize,
    kind: GraphKind,
}

impl TopologyBuilder {
    pub fn new(vertex_count: usize, kind: GraphKind) -> Self {
        TopologyBuilder { vertex_count, kind }
    }

    pub fn undirected(vertex_count: usize) -> Self {
        Self::new(vertex_count, GraphKind::Undirected)
    }

    pub fn directed(vertex_count: usize) -> Self {
        Self::new(vertex_count, GraphKind::Directed)
    }

    pub fn build(&self, edges: &[(VertexId, VertexId)]) -> anyhow::Result<Topology> {
        let arcs = self.expand(edges.iter().map(|&(u, v)| (u, v, ())), edges.len())?;
        let (topology, _) = self.assemble(arcs)?.into_parts();
        Ok(topology)
    }

    pub fn build_weighted<W>(
        &self,
        edges: &[(VertexId, VertexId, W)],
    ) -> anyhow::Result<WeightedTopology<W>>
    where
        W: Copy + PartialOrd + Send + Sync,
    {
        let arcs = self.expand(edges.iter().copied(), edges.len())?;
        self.assemble(arcs)
    }

    fn check_vertex_count(&self) -> anyhow::Result<()> {
        if self.vertex_count > MAX_VERTEX_COUNT {
            bail!(GraphError::InvalidArgument(format!(
                "Vertex count {} exceeds the supported maximum {}",
                self.vertex_count, MAX_VERTEX_COUNT
            )));
        }
        Ok(())
    }

    /// Validates endpoints and materializes the directed arc list.
    fn expand<W, I>(&self, edges: I, len: usize) -> anyhow::Result<Vec<(VertexId, VertexId, W)>>
    where
        W: Copy,
        I: Iterator<Item = (VertexId, VertexId, W)>,
    {
        self.check_vertex_count()?;

        let capacity = match self.kind {
            GraphKind::Undirected => len.saturating_mul(2),
            GraphKind::Directed => len,
        };
        let mut arcs = Vec::new();
        arcs.try_reserve_exact(capacity)
            .map_err(|_| GraphError::BadAllocation("edge buffer"))?;

        for (u, v, w) in edges {
            if u as usize >= self.vertex_count || v as usize >= self.vertex_count {
                bail!(GraphError::InvalidArgument(format!(
                    "Edge ({}, {}) references a vertex outside [0, {})",
                    u, v, self.vertex_count
                )));
            }
            match self.kind {
                GraphKind::Directed => arcs.push((u, v, w)),
                GraphKind::Undirected => {
                    if u != v {
                        arcs.push((u, v, w));
                        arcs.push((v, u, w));
                    }
                }
            }
        }
        Ok(arcs)
    }

    fn assemble<W>(
        &self,
        mut arcs: Vec<(VertexId, VertexId, W)>,
    ) -> anyhow::Result<WeightedTopology<W>>
    where
        W: Copy + PartialOrd + Send + Sync,
    {
        arcs.par_sort_unstable_by(|a, b| {
            (a.0, a.1)
                .cmp(&(b.0, b.1))
                .then_with(|| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
        });
        arcs.dedup_by(|next, kept| next.0 == kept.0 && next.1 == kept.1);

        let row_offsets = exclusive_prefix_sum(&self.out_degrees(&arcs));

        let mut neighbors = Vec::new();
        neighbors
            .try_reserve_exact(arcs.len())
            .map_err(|_| GraphError::BadAllocation("neighbor array"))?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(arcs.len())
            .map_err(|_| GraphError::BadAllocation("edge value array"))?;
        arcs.par_iter()
            .map(|arc| arc.1)
            .collect_into_vec(&mut neighbors);
        arcs.par_iter()
            .map(|arc| arc.2)
            .collect_into_vec(&mut values);

        let topology = Topology::from_sorted_parts(self.kind, row_offsets, neighbors);
        debug_assert!(topology.validate().is_ok());
        log::debug!(
            "Built {:?} topology: {} vertices, {} edges",
            self.kind,
            topology.vertex_count(),
            topology.edge_count()
        );
        WeightedTopology::new(topology, values)
    }

    /// Arc count per source vertex.
    fn out_degrees<W: Sync>(&self, arcs: &[(VertexId, VertexId, W)]) -> Vec<usize> {
        let counts: Vec<AtomicUsize> = (0..self.vertex_count)
            .into_par_iter()
            .map(|_| AtomicUsize::new(0))
            .collect();
        arcs.par_iter().for_each(|arc| {
            counts[arc.0 as usize].fetch_add(1, AtomicOrdering::Relaxed);
        });
        counts.into_iter().map(AtomicUsize::into_inner).collect()
    }
}

/// Reads a square sparse adjacency matrix; stored values become edge weights.
pub fn topology_from_matrix<T>(
    matrix: &CsrMatrix<T>,
    kind: GraphKind,
) -> anyhow::Result<WeightedTopology<T>>
where
    T: Copy + PartialOrd + Send + Sync,
{
    if matrix.nrows() != matrix.ncols() {
        bail!(GraphError::InvalidArgument(format!(
            "Adjacency matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let builder = TopologyBuilder::new(matrix.nrows(), kind);
    builder.check_vertex_count()?;

    let edges: Vec<(VertexId, VertexId, T)> = matrix
        .triplet_iter()
        .map(|(row, col, &value)| (row as VertexId, col as VertexId, value))
        .collect();
    builder.build_weighted(&edges)
}

/// Reads any petgraph graph; direction is taken from the graph itself.
pub fn topology_from_petgraph<G>(graph: G) -> anyhow::Result<Topology>
where
    G: IntoEdgeReferences + NodeIndexable + GraphProp,
{
    let (topology, _) = weighted_topology_from_petgraph(graph, |_| ())?.into_parts();
    Ok(topology)
}

pub fn weighted_topology_from_petgraph<G, W, F>(
    graph: G,
    mut weight: F,
) -> anyhow::Result<WeightedTopology<W>>
where
    G: IntoEdgeReferences + NodeIndexable + GraphProp,
    W: Copy + PartialOrd + Send + Sync,
    F: FnMut(&G::EdgeWeight) -> W,
{
    let kind = if graph.is_directed() {
        GraphKind::Directed
    } else {
        GraphKind::Undirected
    };
    let builder = TopologyBuilder::new(graph.node_bound(), kind);
    builder.check_vertex_count()?;

    let edges: Vec<(VertexId, VertexId, W)> = graph
        .edge_references()
        .map(|edge| {
            (
                graph.to_index(edge.source()) as VertexId,
                graph.to_index(edge.target()) as VertexId,
                weight(edge.weight()),
            )
        })
        .collect();
    builder.build_weighted(&edges)
}
