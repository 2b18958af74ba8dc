//! # Connected Components
//!
//! Afforest-style connected components over a lock-free union-find.
//!
//! The first [`NEIGHBOR_ROUNDS`] neighbors of every vertex are linked, which is
//! usually enough to form the giant component. A random sample of vertices
//! then identifies that component, and only vertices outside it link their
//! remaining edges. Directed topologies are treated as weakly connected, so no
//! vertex is skipped for them in the final pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::policy::Compute;
use crate::topology::{Topology, VertexId};
use crate::utils::exclusive_prefix_sum;

pub const NEIGHBOR_ROUNDS: usize = 2;
pub const SAMPLE_COUNT: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct ConnectedComponents {
    seed: u64,
}

impl Default for ConnectedComponents {
    fn default() -> Self {
        ConnectedComponents { seed: 42 }
    }
}

impl ConnectedComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed of the vertex sample used to find the largest component.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ConnectedComponentsResult {
    labels: Array1<i32>,
    component_count: i64,
}

impl ConnectedComponentsResult {
    /// Component of every vertex, numbered by each component's smallest vertex.
    pub fn labels(&self) -> &Array1<i32> {
        &self.labels
    }

    pub fn component_count(&self) -> i64 {
        self.component_count
    }
}

struct UnionFind {
    parents: Vec<AtomicU32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parents: (0..n as u32).into_par_iter().map(AtomicU32::new).collect(),
        }
    }

    #[inline]
    fn parent(&self, v: VertexId) -> VertexId {
        self.parents[v as usize].load(Ordering::Acquire)
    }

    /// Joins the trees of `u` and `v`; a root only ever moves under a smaller id.
    fn link(&self, u: VertexId, v: VertexId) {
        let mut p1 = self.parent(u);
        let mut p2 = self.parent(v);
        while p1 != p2 {
            let (high, low) = if p1 > p2 { (p1, p2) } else { (p2, p1) };
            let p_high = self.parent(high);
            if p_high == low {
                break;
            }
            if p_high == high
                && self.parents[high as usize]
                    .compare_exchange(high, low, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                break;
            }
            p1 = self.parent(self.parent(high));
            p2 = self.parent(low);
        }
    }

    fn compress(&self) {
        (0..self.parents.len() as u32).into_par_iter().for_each(|v| {
            loop {
                let p = self.parent(v);
                let grand = self.parent(p);
                if p == grand {
                    break;
                }
                self.parents[v as usize].store(grand, Ordering::Release);
            }
        });
    }

    /// Most frequent root among `SAMPLE_COUNT` random vertices.
    fn sample_largest(&self, seed: u64) -> Option<VertexId> {
        let n = self.parents.len();
        if n == 0 {
            return None;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut counts: HashMap<VertexId, usize> = HashMap::new();
        for _ in 0..SAMPLE_COUNT {
            let v = rng.random_range(0..n) as VertexId;
            *counts.entry(self.parent(v)).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(root, _)| root)
    }

    fn into_parents(self) -> Vec<VertexId> {
        self.parents.into_iter().map(AtomicU32::into_inner).collect()
    }
}

/// Union-find roots after Afforest; every vertex points at the smallest vertex
/// of its component.
pub fn afforest(topology: &Topology, seed: u64) -> Vec<VertexId> {
    let n = topology.vertex_count();
    let forest = UnionFind::new(n);

    for round in 0..NEIGHBOR_ROUNDS {
        (0..n as VertexId).into_par_iter().for_each(|v| {
            if let Some(&u) = topology.neighbors(v).get(round) {
                forest.link(v, u);
            }
        });
        forest.compress();
    }

    let largest = forest.sample_largest(seed);
    debug!("Sampled largest intermediate component root {:?}", largest);
    let skip = if topology.is_directed() { None } else { largest };

    (0..n as VertexId).into_par_iter().for_each(|v| {
        if skip.is_some_and(|root| forest.parent(v) == root) {
            return;
        }
        for &u in topology.neighbors(v).iter().skip(NEIGHBOR_ROUNDS) {
            forest.link(v, u);
        }
    });
    forest.compress();

    forest.into_parents()
}

impl Compute<Topology> for ConnectedComponents {
    type Output = ConnectedComponentsResult;

    fn compute(&self, topology: &Topology) -> anyhow::Result<ConnectedComponentsResult> {
        let parents = afforest(topology, self.seed);

        let is_root: Vec<usize> = parents
            .par_iter()
            .enumerate()
            .map(|(v, &p)| usize::from(v as VertexId == p))
            .collect();
        let offsets = exclusive_prefix_sum(&is_root);
        let component_count = offsets[parents.len()];

        let labels: Vec<i32> = parents
            .par_iter()
            .map(|&root| offsets[root as usize] as i32)
            .collect();

        info!(
            "Found {} connected components among {} vertices",
            component_count,
            parents.len()
        );
        Ok(ConnectedComponentsResult {
            labels: Array1::from_vec(labels),
            component_count: component_count as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;
    use std::collections::VecDeque;

    fn bfs_labels(topology: &Topology) -> (Vec<i32>, i64) {
        let n = topology.vertex_count();
        let mut labels = vec![-1i32; n];
        let mut next = 0;
        for start in 0..n {
            if labels[start] >= 0 {
                continue;
            }
            labels[start] = next;
            let mut queue = VecDeque::from([start as u32]);
            while let Some(v) = queue.pop_front() {
                for &u in topology.neighbors(v) {
                    if labels[u as usize] < 0 {
                        labels[u as usize] = next;
                        queue.push_back(u);
                    }
                }
            }
            next += 1;
        }
        (labels, next as i64)
    }

    #[test]
    fn test_small_components() {
        let topology = TopologyBuilder::undirected(7)
            .build(&[(0, 3), (3, 5), (1, 2), (6, 2)])
            .unwrap();
        let result = ConnectedComponents::new().compute(&topology).unwrap();
        assert_eq!(result.labels().to_vec(), vec![0, 1, 1, 0, 2, 0, 1]);
        assert_eq!(result.component_count(), 3);
    }

    #[test]
    fn test_matches_bfs() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for (n, m) in [(50usize, 30usize), (2000, 1800), (2000, 6000)] {
            let edges: Vec<(u32, u32)> = (0..m)
                .map(|_| (rng.random_range(0..n) as u32, rng.random_range(0..n) as u32))
                .collect();
            let topology = TopologyBuilder::undirected(n).build(&edges).unwrap();
            let (expected, count) = bfs_labels(&topology);
            let result = ConnectedComponents::new().compute(&topology).unwrap();
            assert_eq!(result.labels().to_vec(), expected);
            assert_eq!(result.component_count(), count);
        }
    }

    #[test]
    fn test_directed_is_weakly_connected() {
        // 2 -> 0 and 1 -> 2 only reach 0 backwards
        let topology = TopologyBuilder::directed(4)
            .build(&[(2, 0), (1, 2), (3, 3)])
            .unwrap();
        let result = ConnectedComponents::new().compute(&topology).unwrap();
        assert_eq!(result.labels().to_vec(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_empty_graph() {
        let topology = TopologyBuilder::undirected(0).build(&[]).unwrap();
        let result = ConnectedComponents::new().compute(&topology).unwrap();
        assert_eq!(result.component_count(), 0);
        assert!(result.labels().is_empty());
    }
}
