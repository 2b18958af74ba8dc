//! # Vertex Similarity
//!
//! Jaccard similarity over a rectangular block of the adjacency matrix:
//! `|N(i) ∩ N(j)| / |N(i) ∪ N(j)|` for every `i` in the row range and every
//! `j <= i` in the column range. The output is sparse: pairs without common
//! neighbors are left out, the diagonal is always present with value 1.

use std::ops::Range;

use anyhow::anyhow;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::intersection::{self, intersection, ranges_disjoint};
use crate::policy::Compute;
use crate::topology::{Topology, VertexId};
use crate::GraphError;

pub struct JaccardBuilder {
    row_range: Option<Range<usize>>,
    column_range: Option<Range<usize>>,
}

impl JaccardBuilder {
    pub fn new() -> Self {
        JaccardBuilder {
            row_range: None,
            column_range: None,
        }
    }

    pub fn row_range(mut self, begin: usize, end: usize) -> Self {
        self.row_range = Some(begin..end);
        self
    }

    pub fn column_range(mut self, begin: usize, end: usize) -> Self {
        self.column_range = Some(begin..end);
        self
    }

    /// Both ranges default to the whole vertex set of the input graph.
    pub fn build(self) -> Jaccard {
        Jaccard {
            row_range: self.row_range,
            column_range: self.column_range,
        }
    }
}

impl Default for JaccardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Jaccard {
    row_range: Option<Range<usize>>,
    column_range: Option<Range<usize>>,
}

#[derive(Debug, Clone)]
pub struct VertexSimilarityResult {
    /// One row per emitted pair: column 0 is the row vertex, column 1 the column vertex.
    pub vertex_pairs: Array2<i32>,
    pub coefficients: Array1<f32>,
    pub nonzero_coeff_count: usize,
}

fn resolve_range(range: &Option<Range<usize>>, vertex_count: usize) -> anyhow::Result<Range<usize>> {
    let range = range.clone().unwrap_or(0..vertex_count);
    if range.start > range.end || range.end > vertex_count {
        return Err(GraphError::InvalidRange {
            begin: range.start,
            end: range.end,
            vertex_count,
        }
        .into());
    }
    Ok(range)
}

impl Jaccard {
    pub fn builder() -> JaccardBuilder {
        JaccardBuilder::new()
    }

    fn row_pairs(topology: &Topology, i: usize, columns: &Range<usize>) -> Vec<(i32, i32, f32)> {
        let mut pairs = Vec::new();
        let upper = columns.end.min(i + 1);
        if columns.start >= upper {
            return pairs;
        }

        let i_neighbors = topology.neighbors(i as VertexId);
        for j in columns.start..upper {
            if j == i {
                pairs.push((i as i32, j as i32, 1.0));
                continue;
            }
            let j_neighbors = topology.neighbors(j as VertexId);
            if ranges_disjoint(i_neighbors, j_neighbors) {
                continue;
            }
            let common = intersection(i_neighbors, j_neighbors);
            if common == 0 {
                continue;
            }
            let union = i_neighbors.len() + j_neighbors.len() - common;
            pairs.push((i as i32, j as i32, common as f32 / union as f32));
        }
        pairs
    }
}

impl Compute<Topology> for Jaccard {
    type Output = VertexSimilarityResult;

    fn compute(&self, topology: &Topology) -> anyhow::Result<VertexSimilarityResult> {
        let vertex_count = topology.vertex_count();
        let rows = resolve_range(&self.row_range, vertex_count)?;
        let columns = resolve_range(&self.column_range, vertex_count)?;
        debug!(
            "Jaccard block rows {:?} x columns {:?} with {:?} kernel",
            rows,
            columns,
            intersection::IntersectionKernel::detect()
        );

        let per_row: Vec<Vec<(i32, i32, f32)>> = rows
            .into_par_iter()
            .map(|i| Self::row_pairs(topology, i, &columns))
            .collect();

        let nnz: usize = per_row.iter().map(Vec::len).sum();
        let mut flat_pairs = Vec::with_capacity(nnz * 2);
        let mut coefficients = Vec::with_capacity(nnz);
        for (first, second, coefficient) in per_row.into_iter().flatten() {
            flat_pairs.push(first);
            flat_pairs.push(second);
            coefficients.push(coefficient);
        }

        let vertex_pairs = Array2::from_shape_vec((nnz, 2), flat_pairs)
            .map_err(|e| anyhow!("Failed to shape vertex pair table: {}", e))?;
        info!("Jaccard produced {} nonzero coefficients", nnz);

        Ok(VertexSimilarityResult {
            vertex_pairs,
            coefficients: Array1::from_vec(coefficients),
            nonzero_coeff_count: nnz,
        })
    }
}

/// Jaccard coefficient of a single pair, computed with the scalar kernel.
pub fn jaccard_coefficient(topology: &Topology, i: VertexId, j: VertexId) -> f32 {
    if i == j {
        return 1.0;
    }
    let a = topology.neighbors(i);
    let b = topology.neighbors(j);
    let common = intersection::scalar::intersection(a, b);
    if common == 0 {
        return 0.0;
    }
    common as f32 / (a.len() + b.len() - common) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn triangle_with_isolated() -> Topology {
        TopologyBuilder::undirected(4)
            .build(&[(0, 1), (1, 2), (0, 2)])
            .unwrap()
    }

    fn random_topology(n: usize, edges: usize, seed: u64) -> Topology {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let list: Vec<(u32, u32)> = (0..edges)
            .map(|_| (rng.random_range(0..n) as u32, rng.random_range(0..n) as u32))
            .collect();
        TopologyBuilder::undirected(n).build(&list).unwrap()
    }

    #[test]
    fn test_triangle_example() {
        let topology = triangle_with_isolated();
        let result = Jaccard::builder().build().compute(&topology).unwrap();

        assert_eq!(result.nonzero_coeff_count, 7);
        assert_eq!(result.vertex_pairs.dim(), (7, 2));
        assert_eq!(result.vertex_pairs.row(1).to_vec(), vec![1, 0]);
        assert_relative_eq!(result.coefficients[1], 1.0 / 3.0, epsilon = 1e-6);
        // isolated vertex only appears on the diagonal
        assert_eq!(result.vertex_pairs.row(6).to_vec(), vec![3, 3]);
        assert_eq!(result.coefficients[6], 1.0);
    }

    #[test]
    fn test_zero_intersection_omitted() {
        let topology = TopologyBuilder::undirected(4)
            .build(&[(0, 1), (2, 3)])
            .unwrap();
        let result = Jaccard::builder()
            .row_range(0, 4)
            .column_range(0, 4)
            .build()
            .compute(&topology)
            .unwrap();
        // only the diagonal: no pair shares a neighbor
        assert_eq!(result.nonzero_coeff_count, 4);
        for row in result.vertex_pairs.rows() {
            assert_eq!(row[0], row[1]);
        }
    }

    #[test]
    fn test_symmetry_and_bounds() {
        let topology = random_topology(200, 1500, 11);
        let result = Jaccard::builder()
            .row_range(50, 200)
            .column_range(0, 120)
            .build()
            .compute(&topology)
            .unwrap();

        assert_eq!(result.coefficients.len(), result.nonzero_coeff_count);
        for (pair, &coefficient) in result.vertex_pairs.rows().into_iter().zip(result.coefficients.iter()) {
            let (i, j) = (pair[0] as u32, pair[1] as u32);
            assert!(j <= i);
            assert!((0.0..=1.0).contains(&coefficient));
            if i == j {
                assert_eq!(coefficient, 1.0);
            }
            assert_relative_eq!(coefficient, jaccard_coefficient(&topology, j, i), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_block_matches_pairwise_reference() {
        let topology = random_topology(80, 400, 3);
        let result = Jaccard::builder().build().compute(&topology).unwrap();
        let mut expected = 0;
        for i in 0..80u32 {
            for j in 0..=i {
                if jaccard_coefficient(&topology, i, j) > 0.0 {
                    expected += 1;
                }
            }
        }
        assert_eq!(result.nonzero_coeff_count, expected);
    }

    #[test]
    fn test_column_range_above_rows_is_empty() {
        let topology = triangle_with_isolated();
        let result = Jaccard::builder()
            .row_range(0, 2)
            .column_range(2, 4)
            .build()
            .compute(&topology)
            .unwrap();
        assert_eq!(result.nonzero_coeff_count, 0);
    }

    #[test]
    fn test_invalid_range() {
        let topology = triangle_with_isolated();
        let err = Jaccard::builder()
            .row_range(0, 10)
            .build()
            .compute(&topology)
            .unwrap_err();
        assert!(matches!(
            crate::graph_error(&err),
            Some(GraphError::InvalidRange { end: 10, .. })
        ));
    }
}
