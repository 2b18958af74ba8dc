use crate::topology::{Topology, VertexId};

/// Order in which pattern vertices are assigned during the search.
///
/// `linked[i]` lists the earlier positions adjacent to position `i` in the
/// pattern, `unlinked[i]` the earlier positions that are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingOrder {
    pub order: Vec<VertexId>,
    pub linked: Vec<Vec<usize>>,
    pub unlinked: Vec<Vec<usize>>,
}

impl MatchingOrder {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Greedy ordering: the highest-degree vertex first, then repeatedly the
/// vertex with the most edges into the ordered prefix. Ties go to the higher
/// degree, then the smaller id.
pub fn sort_pattern(pattern: &Topology) -> MatchingOrder {
    let n = pattern.vertex_count();
    let mut placed = vec![false; n];
    let mut links = vec![0usize; n];
    let mut order: Vec<VertexId> = Vec::with_capacity(n);

    for _ in 0..n {
        let mut best: Option<VertexId> = None;
        for v in 0..n as VertexId {
            if placed[v as usize] {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let key_v = (links[v as usize], pattern.degree(v));
                    let key_b = (links[b as usize], pattern.degree(b));
                    key_v > key_b
                }
            };
            if better {
                best = Some(v);
            }
        }
        let Some(next) = best else { break };
        placed[next as usize] = true;
        for &u in pattern.neighbors(next) {
            links[u as usize] += 1;
        }
        order.push(next);
    }

    let mut linked = Vec::with_capacity(n);
    let mut unlinked = Vec::with_capacity(n);
    for (i, &v) in order.iter().enumerate() {
        let (adjacent, apart): (Vec<usize>, Vec<usize>) =
            (0..i).partition(|&j| pattern.has_edge(v, order[j]));
        linked.push(adjacent);
        unlinked.push(apart);
    }

    MatchingOrder {
        order,
        linked,
        unlinked,
    }
}
