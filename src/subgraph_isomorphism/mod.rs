//! # Subgraph Isomorphism
//!
//! Enumerates embeddings of a pattern graph in a target graph by depth-first
//! backtracking. Pattern vertices are assigned in a fixed order; at each depth
//! the set of admissible target vertices is a bit vector narrowed by the
//! adjacency rows of the already-mapped pattern neighbors.
//!
//! Two notions of match are supported:
//!
//! - [`MatchKind::NonInduced`]: every pattern edge maps to a target edge.
//! - [`MatchKind::Induced`]: additionally, non-adjacent pattern vertices map to
//!   non-adjacent target vertices.
//!
//! Vertex and edge attributes restrict matches only when both graphs carry
//! them. With a `max_match_count` limit the search runs in parallel, so which
//! matches are returned is not deterministic, only how many.

use anyhow::{anyhow, bail};
use log::{debug, info};
use ndarray::Array2;

use crate::policy::Compute;
use crate::topology::{Topology, VertexId};
use crate::GraphError;

mod bit_vector;
mod engine;
mod sorter;
mod storage;

pub use bit_vector::BitVector;
pub use sorter::{sort_pattern, MatchingOrder};
pub use storage::{density, StorageKind, GRAPH_STORAGE_DIVIDER_BY_DENSITY};

use engine::Engine;
use storage::TargetStorage;

/// An undirected topology with optional integer labels on vertices and edges.
///
/// Edge attributes are aligned with `topology.col_indices()`, so each
/// undirected edge carries a value in both directions.
#[derive(Debug, Clone)]
pub struct AttributedGraph {
    topology: Topology,
    vertex_attributes: Option<Vec<i64>>,
    edge_attributes: Option<Vec<i64>>,
}

impl AttributedGraph {
    pub fn new(topology: Topology) -> Self {
        AttributedGraph {
            topology,
            vertex_attributes: None,
            edge_attributes: None,
        }
    }

    pub fn with_vertex_attributes(mut self, attributes: Vec<i64>) -> anyhow::Result<Self> {
        if attributes.len() != self.topology.vertex_count() {
            bail!(GraphError::InvalidArgument(format!(
                "Expected {} vertex attributes, got {}",
                self.topology.vertex_count(),
                attributes.len()
            )));
        }
        self.vertex_attributes = Some(attributes);
        Ok(self)
    }

    pub fn with_edge_attributes(mut self, attributes: Vec<i64>) -> anyhow::Result<Self> {
        if attributes.len() != self.topology.col_indices().len() {
            bail!(GraphError::InvalidArgument(format!(
                "Expected {} edge attributes, got {}",
                self.topology.col_indices().len(),
                attributes.len()
            )));
        }
        self.edge_attributes = Some(attributes);
        Ok(self)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn vertex_attribute(&self, vertex: VertexId) -> Option<i64> {
        self.vertex_attributes
            .as_ref()
            .map(|values| values[vertex as usize])
    }

    pub fn has_edge_attributes(&self) -> bool {
        self.edge_attributes.is_some()
    }

    pub fn edge_attribute(&self, from: VertexId, to: VertexId) -> Option<i64> {
        let values = self.edge_attributes.as_ref()?;
        let position = self.topology.neighbors(from).binary_search(&to).ok()?;
        Some(values[self.topology.row_offsets()[from as usize] + position])
    }
}

impl From<Topology> for AttributedGraph {
    fn from(topology: Topology) -> Self {
        AttributedGraph::new(topology)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchKind {
    #[default]
    NonInduced,
    Induced,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubgraphIsomorphism {
    kind: MatchKind,
    max_match_count: i64,
    storage: StorageKind,
}

impl SubgraphIsomorphism {
    /// Non-induced matching, no match limit, storage chosen by density.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: MatchKind) -> Self {
        self.kind = kind;
        self
    }

    /// Zero means unlimited.
    pub fn max_match_count(mut self, max_match_count: i64) -> Self {
        self.max_match_count = max_match_count;
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn find(
        &self,
        target: &AttributedGraph,
        pattern: &AttributedGraph,
    ) -> anyhow::Result<SubgraphIsomorphismResult> {
        self.compute(&MatchingInput { target, pattern })
    }

    fn validate(&self, input: &MatchingInput<'_>) -> anyhow::Result<()> {
        let target = input.target.topology();
        let pattern = input.pattern.topology();
        if target.vertex_count() == 0 {
            bail!(GraphError::EmptyTargetGraph);
        }
        if pattern.vertex_count() == 0 {
            bail!(GraphError::EmptyPatternGraph);
        }
        if target.vertex_count() < pattern.vertex_count() {
            bail!(GraphError::TargetSmallerThanPattern {
                target: target.vertex_count(),
                pattern: pattern.vertex_count(),
            });
        }
        if self.max_match_count < 0 {
            bail!(GraphError::NegativeMaxMatchCount(self.max_match_count));
        }
        if target.is_directed() || pattern.is_directed() {
            bail!(GraphError::DirectedGraphNotSupported);
        }
        Ok(())
    }
}

/// Target and pattern graph of a matching run.
#[derive(Debug, Clone, Copy)]
pub struct MatchingInput<'a> {
    pub target: &'a AttributedGraph,
    pub pattern: &'a AttributedGraph,
}

#[derive(Debug, Clone)]
pub struct SubgraphIsomorphismResult {
    vertex_match: Array2<i32>,
}

impl SubgraphIsomorphismResult {
    /// One row per match; column `p` holds the target vertex assigned to
    /// pattern vertex `p`. Rows are sorted lexicographically.
    pub fn vertex_match(&self) -> &Array2<i32> {
        &self.vertex_match
    }

    pub fn match_count(&self) -> i64 {
        self.vertex_match.nrows() as i64
    }
}

impl Compute<MatchingInput<'_>> for SubgraphIsomorphism {
    type Output = SubgraphIsomorphismResult;

    fn compute(&self, input: &MatchingInput<'_>) -> anyhow::Result<SubgraphIsomorphismResult> {
        self.validate(input)?;

        let storage = TargetStorage::build(input.target.topology(), self.storage)?;
        let order = sort_pattern(input.pattern.topology());
        debug!(
            "Matching with {:?} storage, pattern vertex order {:?}",
            storage.kind(),
            order.order
        );

        let limit = (self.max_match_count > 0).then_some(self.max_match_count as usize);
        let engine = Engine::new(input.target, input.pattern, &storage, &order, self.kind, limit);
        let mut rows = engine.run();
        rows.sort_unstable();

        let width = input.pattern.topology().vertex_count();
        let count = rows.len();
        info!("Found {} {:?} matches", count, self.kind);

        let flat: Vec<i32> = rows.into_iter().flatten().collect();
        let vertex_match = Array2::from_shape_vec((count, width), flat)
            .map_err(|e| anyhow!("Failed to shape match table: {}", e))?;
        Ok(SubgraphIsomorphismResult { vertex_match })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn graph(n: usize, edges: &[(u32, u32)]) -> AttributedGraph {
        TopologyBuilder::undirected(n).build(edges).unwrap().into()
    }

    fn complete(n: u32) -> AttributedGraph {
        let mut edges = Vec::new();
        for u in 0..n {
            for v in (u + 1)..n {
                edges.push((u, v));
            }
        }
        graph(n as usize, &edges)
    }

    fn assert_sound(target: &AttributedGraph, pattern: &AttributedGraph, result: &SubgraphIsomorphismResult) {
        for row in result.vertex_match().rows() {
            let mut seen = std::collections::HashSet::new();
            for &t in row.iter() {
                assert!(seen.insert(t), "mapping is not injective: {:?}", row);
            }
            let p = pattern.topology();
            for u in 0..p.vertex_count() as u32 {
                for &v in p.neighbors(u) {
                    assert!(target
                        .topology()
                        .has_edge(row[u as usize] as u32, row[v as usize] as u32));
                }
            }
        }
    }

    #[test]
    fn test_triangles_in_k4() {
        let _ = env_logger::builder().is_test(true).try_init();
        let target = complete(4);
        let pattern = complete(3);
        for storage in [StorageKind::Bit, StorageKind::List, StorageKind::AutoDetect] {
            let result = SubgraphIsomorphism::new()
                .storage(storage)
                .find(&target, &pattern)
                .unwrap();
            // 4 triangles, 6 automorphisms each
            assert_eq!(result.match_count(), 24);
            assert_eq!(result.vertex_match().dim(), (24, 3));
            assert_sound(&target, &pattern, &result);
        }
    }

    #[test]
    fn test_rows_sorted() {
        let target = complete(5);
        let pattern = graph(2, &[(0, 1)]);
        let result = SubgraphIsomorphism::new().find(&target, &pattern).unwrap();
        assert_eq!(result.match_count(), 20);
        let rows: Vec<Vec<i32>> = result.vertex_match().rows().into_iter().map(|r| r.to_vec()).collect();
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(rows[0], vec![0, 1]);
    }

    #[test]
    fn test_induced_rejects_extra_edges() {
        // path of length 2 inside a triangle: non-induced finds it, induced does not
        let target = complete(3);
        let pattern = graph(3, &[(0, 1), (1, 2)]);
        let non_induced = SubgraphIsomorphism::new().find(&target, &pattern).unwrap();
        assert_eq!(non_induced.match_count(), 6);

        let induced = SubgraphIsomorphism::new()
            .kind(MatchKind::Induced)
            .find(&target, &pattern)
            .unwrap();
        assert_eq!(induced.match_count(), 0);
    }

    #[test]
    fn test_induced_on_square() {
        // 4-cycle: induced paths of 3 vertices are all 8 directed corners
        let target = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let pattern = graph(3, &[(0, 1), (1, 2)]);
        let result = SubgraphIsomorphism::new()
            .kind(MatchKind::Induced)
            .find(&target, &pattern)
            .unwrap();
        assert_eq!(result.match_count(), 8);
        for row in result.vertex_match().rows() {
            assert!(!target.topology().has_edge(row[0] as u32, row[2] as u32));
        }
    }

    #[test]
    fn test_max_match_count_limits() {
        let target = complete(6);
        let pattern = complete(3);
        let result = SubgraphIsomorphism::new()
            .max_match_count(5)
            .find(&target, &pattern)
            .unwrap();
        assert_eq!(result.match_count(), 5);
        assert_sound(&target, &pattern, &result);
    }

    #[test]
    fn test_vertex_attributes_filter() {
        let target = complete(4).with_vertex_attributes(vec![1, 2, 1, 2]).unwrap();
        let pattern = graph(2, &[(0, 1)]).with_vertex_attributes(vec![1, 2]).unwrap();
        let result = SubgraphIsomorphism::new().find(&target, &pattern).unwrap();
        assert_eq!(result.match_count(), 4);
        for row in result.vertex_match().rows() {
            assert_eq!(row[0] % 2, 0);
            assert_eq!(row[1] % 2, 1);
        }
    }

    #[test]
    fn test_edge_attributes_filter() {
        // triangle with edge labels 0-1:7, 1-2:8, 0-2:7
        let topology = TopologyBuilder::undirected(3)
            .build(&[(0, 1), (1, 2), (0, 2)])
            .unwrap();
        let mut labels = Vec::new();
        for u in 0..3u32 {
            for &v in topology.neighbors(u) {
                labels.push(if (u, v) == (1, 2) || (u, v) == (2, 1) { 8 } else { 7 });
            }
        }
        let target = AttributedGraph::new(topology).with_edge_attributes(labels).unwrap();

        let pattern_topology = TopologyBuilder::undirected(2).build(&[(0, 1)]).unwrap();
        let pattern = AttributedGraph::new(pattern_topology)
            .with_edge_attributes(vec![8, 8])
            .unwrap();
        let result = SubgraphIsomorphism::new().find(&target, &pattern).unwrap();
        let rows: Vec<Vec<i32>> = result.vertex_match().rows().into_iter().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![1, 2], vec![2, 1]]);
    }

    #[test]
    fn test_random_soundness_and_storage_agreement() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let edges: Vec<(u32, u32)> = (0..120)
            .map(|_| (rng.random_range(0..30), rng.random_range(0..30)))
            .collect();
        let target = graph(30, &edges);
        let pattern = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);

        let bit = SubgraphIsomorphism::new()
            .storage(StorageKind::Bit)
            .find(&target, &pattern)
            .unwrap();
        let list = SubgraphIsomorphism::new()
            .storage(StorageKind::List)
            .find(&target, &pattern)
            .unwrap();
        assert_eq!(bit.vertex_match(), list.vertex_match());
        assert_sound(&target, &pattern, &bit);
    }

    #[test]
    fn test_sparse_path_storages_agree() {
        let n = 3000u32;
        let edges: Vec<(u32, u32)> = (1..n).map(|v| (v - 1, v)).collect();
        let target = graph(n as usize, &edges);
        let edge = graph(2, &[(0, 1)]);
        let corner = graph(3, &[(0, 1), (1, 2)]);

        for (pattern, expected) in [(&edge, 2 * (n as i64 - 1)), (&corner, 2 * (n as i64 - 2))] {
            let results: Vec<SubgraphIsomorphismResult> =
                [StorageKind::List, StorageKind::Bit, StorageKind::AutoDetect]
                    .into_iter()
                    .map(|storage| {
                        SubgraphIsomorphism::new()
                            .kind(MatchKind::Induced)
                            .storage(storage)
                            .find(&target, pattern)
                            .unwrap()
                    })
                    .collect();
            for result in &results {
                assert_eq!(result.match_count(), expected);
                assert_eq!(result.vertex_match(), results[0].vertex_match());
            }
            assert_sound(&target, pattern, &results[0]);
        }
    }

    #[test]
    fn test_preconditions() {
        let empty = graph(0, &[]);
        let small = complete(2);
        let big = complete(3);
        let check = |descriptor: SubgraphIsomorphism,
                     target: &AttributedGraph,
                     pattern: &AttributedGraph,
                     expected: GraphError| {
            let err = descriptor.find(target, pattern).unwrap_err();
            assert_eq!(crate::graph_error(&err), Some(&expected));
        };

        check(SubgraphIsomorphism::new(), &empty, &small, GraphError::EmptyTargetGraph);
        check(SubgraphIsomorphism::new(), &big, &empty, GraphError::EmptyPatternGraph);
        check(
            SubgraphIsomorphism::new(),
            &small,
            &big,
            GraphError::TargetSmallerThanPattern {
                target: 2,
                pattern: 3,
            },
        );
        check(
            SubgraphIsomorphism::new().max_match_count(-1),
            &big,
            &small,
            GraphError::NegativeMaxMatchCount(-1),
        );

        let directed: AttributedGraph = TopologyBuilder::directed(3)
            .build(&[(0, 1), (1, 2), (2, 0)])
            .unwrap()
            .into();
        check(
            SubgraphIsomorphism::new(),
            &directed,
            &small,
            GraphError::DirectedGraphNotSupported,
        );
        check(
            SubgraphIsomorphism::new(),
            &big,
            &directed,
            GraphError::DirectedGraphNotSupported,
        );
        // the match-count check runs before the direction check
        check(
            SubgraphIsomorphism::new().max_match_count(-2),
            &directed,
            &small,
            GraphError::NegativeMaxMatchCount(-2),
        );
    }

    #[test]
    fn test_attribute_length_checked() {
        assert!(complete(3).with_vertex_attributes(vec![1, 2]).is_err());
        assert!(complete(3).with_edge_attributes(vec![1; 5]).is_err());
    }
}
