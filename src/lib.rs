//! Graph analytics kernels: CSR topologies, SIMD set intersection, Jaccard
//! vertex similarity, triangle counting, delta-stepping shortest paths,
//! subgraph isomorphism and connected components.
//!
//! Every algorithm is a descriptor implementing [`Compute`]; run it with
//! `compute` on the global rayon pool or with `compute_with` on a
//! [`HostPolicy`].

pub mod connected_components;
pub mod error;
pub mod intersection;
pub mod policy;
pub mod shortest_paths;
pub mod subgraph_isomorphism;
pub mod topology;
pub mod triangle_counting;
pub mod vertex_similarity;
mod utils;

pub use error::{graph_error, GraphError};
pub use policy::{Compute, HostPolicy};
pub use topology::{GraphKind, Topology, TopologyBuilder, VertexId, WeightedTopology};
