use log::debug;

use super::bit_vector::BitVector;
use crate::topology::{Topology, VertexId};
use crate::GraphError;

/// Edge density above which the target is stored as adjacency bit rows.
pub const GRAPH_STORAGE_DIVIDER_BY_DENSITY: f64 = 0.015;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    AutoDetect,
    Bit,
    List,
}

/// Fraction of all possible undirected edges present in `topology`.
pub fn density(topology: &Topology) -> f64 {
    let n = topology.vertex_count() as f64;
    if n < 2.0 {
        return 0.0;
    }
    topology.edge_count() as f64 / (n * (n - 1.0) / 2.0)
}

/// Target adjacency in the form the matcher narrows candidate sets with.
pub(crate) enum TargetStorage<'a> {
    Bit(Vec<BitVector>),
    List(&'a Topology),
}

impl<'a> TargetStorage<'a> {
    pub fn build(topology: &'a Topology, kind: StorageKind) -> anyhow::Result<Self> {
        let resolved = match kind {
            StorageKind::AutoDetect => {
                let density = density(topology);
                if density > GRAPH_STORAGE_DIVIDER_BY_DENSITY {
                    StorageKind::Bit
                } else {
                    StorageKind::List
                }
            }
            other => other,
        };
        debug!(
            "Target storage {:?} for {} vertices, density {:.4}",
            resolved,
            topology.vertex_count(),
            density(topology)
        );

        match resolved {
            StorageKind::Bit => {
                let n = topology.vertex_count();
                let mut rows = Vec::new();
                rows.try_reserve_exact(n)
                    .map_err(|_| GraphError::BadAllocation("adjacency bit rows"))?;
                for v in 0..n as VertexId {
                    rows.push(BitVector::from_indices(n, topology.neighbors(v)));
                }
                Ok(TargetStorage::Bit(rows))
            }
            _ => Ok(TargetStorage::List(topology)),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            TargetStorage::Bit(_) => StorageKind::Bit,
            TargetStorage::List(_) => StorageKind::List,
        }
    }

    /// `candidates &= adj(vertex)`
    ///
    /// List storage walks the neighbor list only; `kept` is scratch for the
    /// surviving ids.
    pub fn keep_neighbors(
        &self,
        vertex: VertexId,
        candidates: &mut BitVector,
        kept: &mut Vec<VertexId>,
    ) {
        match self {
            TargetStorage::Bit(rows) => candidates.and_assign(&rows[vertex as usize]),
            TargetStorage::List(topology) => {
                kept.clear();
                kept.extend(
                    topology
                        .neighbors(vertex)
                        .iter()
                        .copied()
                        .filter(|&neighbor| candidates.get(neighbor)),
                );
                candidates.clear();
                for &neighbor in kept.iter() {
                    candidates.set(neighbor);
                }
            }
        }
    }

    /// `candidates &= !adj(vertex)`
    pub fn drop_neighbors(&self, vertex: VertexId, candidates: &mut BitVector) {
        match self {
            TargetStorage::Bit(rows) => candidates.and_not_assign(&rows[vertex as usize]),
            TargetStorage::List(topology) => {
                for &neighbor in topology.neighbors(vertex) {
                    candidates.unset(neighbor);
                }
            }
        }
    }
}
