//! Combinatorial structure of a resolved mesh: unique edges, manifold
//! patches, the radial order of facets around edges, and the cells of space
//! the patches bound.

pub mod cells;
pub mod edges;
pub(crate) mod order;
pub mod patches;

pub use cells::{CellDecomposition, extract_cells};
pub use edges::UniqueEdgeMap;
pub use patches::{Patches, extract_manifold_patches};

use crate::config::BooleanConfig;
use crate::mesh::ExactMesh;

/// Everything the winding-number stage needs about a resolved mesh.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub edges: UniqueEdgeMap,
    pub patches: Patches,
    pub cells: CellDecomposition,
}

impl Topology {
    /// Edge map, patches and cells of a mesh whose faces do not cross.
    pub fn build(mesh: &ExactMesh, config: &BooleanConfig) -> Self {
        let edges = UniqueEdgeMap::new(&mesh.faces);
        let patches = extract_manifold_patches(mesh.faces.len(), &edges);
        let cells = extract_cells(&mesh.vertices, &mesh.faces, &patches, &edges, config);
        Self { edges, patches, cells }
    }
}
