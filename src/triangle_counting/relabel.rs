use rayon::prelude::*;

use crate::topology::{GraphKind, Topology, VertexId};
use crate::utils::{exclusive_prefix_sum, split_by_offsets_mut};

/// A degree-ordered copy of a topology plus the mapping back to original ids.
pub struct RelabeledTopology {
    pub topology: Topology,
    /// `new_to_old[new_id]` is the original id of a relabeled vertex.
    pub new_to_old: Vec<VertexId>,
}

/// Renumbers vertices by descending degree, ties broken by original id.
///
/// The result is a pure permutation of the input graph.
pub fn relabel_by_descending_degree(topology: &Topology) -> RelabeledTopology {
    let vertex_count = topology.vertex_count();
    let degrees = topology.degrees();

    let mut order: Vec<(u32, VertexId)> = (0..vertex_count)
        .into_par_iter()
        .map(|v| (degrees[v], v as VertexId))
        .collect();
    order.par_sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let new_to_old: Vec<VertexId> = order.par_iter().map(|&(_, v)| v).collect();
    let mut old_to_new = vec![0 as VertexId; vertex_count];
    for (new_id, &old_id) in new_to_old.iter().enumerate() {
        old_to_new[old_id as usize] = new_id as VertexId;
    }

    let new_degrees: Vec<usize> = new_to_old
        .par_iter()
        .map(|&old| degrees[old as usize] as usize)
        .collect();
    let row_offsets = exclusive_prefix_sum(&new_degrees);

    let mut neighbors = vec![0 as VertexId; topology.col_indices().len()];
    split_by_offsets_mut(&mut neighbors, &row_offsets)
        .into_par_iter()
        .zip(new_to_old.par_iter())
        .for_each(|(slot, &old)| {
            for (dst, &u) in slot.iter_mut().zip(topology.neighbors(old)) {
                *dst = old_to_new[u as usize];
            }
            slot.sort_unstable();
        });

    RelabeledTopology {
        topology: Topology::from_sorted_parts(GraphKind::Undirected, row_offsets, neighbors),
        new_to_old,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;

    #[test]
    fn test_relabel_orders_by_degree() {
        // star centered on 3 plus edge 0-1
        let topology = TopologyBuilder::undirected(5)
            .build(&[(3, 0), (3, 1), (3, 2), (3, 4), (0, 1)])
            .unwrap();
        let relabeled = relabel_by_descending_degree(&topology);

        assert_eq!(relabeled.new_to_old, vec![3, 0, 1, 2, 4]);
        let degrees: Vec<u32> = relabeled.topology.degrees().to_vec();
        assert!(degrees.windows(2).all(|w| w[0] >= w[1]));
        assert!(relabeled.topology.validate().is_ok());
        assert_eq!(relabeled.topology.edge_count(), topology.edge_count());
    }

    #[test]
    fn test_relabel_preserves_edges() {
        let topology = TopologyBuilder::undirected(6)
            .build(&[(0, 5), (1, 5), (2, 5), (1, 2), (3, 4), (0, 1)])
            .unwrap();
        let relabeled = relabel_by_descending_degree(&topology);
        for new_u in 0..6u32 {
            for &new_v in relabeled.topology.neighbors(new_u) {
                let old_u = relabeled.new_to_old[new_u as usize];
                let old_v = relabeled.new_to_old[new_v as usize];
                assert!(topology.has_edge(old_u, old_v));
            }
        }
    }
}
