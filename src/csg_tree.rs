//! Eagerly evaluated CSG trees.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`]. Every
//! node stores its exact result, so chaining operations never rounds, and its
//! birth indices in the flattened numbering of all leaf faces below it: the
//! left subtree's leaves come first, then the right subtree's.
//!
//! ```
//! use meshwind::{BooleanType, CsgTree, TriMesh};
//! use nalgebra::Point3;
//!
//! let tet = |dx: f64| TriMesh::new(
//!     vec![
//!         Point3::new(dx, 0.0, 0.0),
//!         Point3::new(dx + 1.0, 0.0, 0.0),
//!         Point3::new(dx, 1.0, 0.0),
//!         Point3::new(dx, 0.0, 1.0),
//!     ],
//!     vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
//! );
//! let mut tree = CsgTree::default();
//! let a = tree.leaf(&tet(0.0)).unwrap();
//! let b = tree.leaf(&tet(3.0)).unwrap();
//! let both = tree.apply(BooleanType::Union, a, b).unwrap();
//! assert_eq!(tree.birth(both).unwrap().len(), 8);
//! ```

use crate::boolean::{BooleanType, mesh_boolean_exact};
use crate::config::BooleanConfig;
use crate::errors::{BooleanError, BooleanResult};
use crate::mesh::{ExactMesh, TriMesh};

/// Index of a node in its [`CsgTree`].
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsgOperation {
    Leaf,
    Boolean {
        op: BooleanType,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug, Clone)]
pub struct CsgNode {
    pub operation: CsgOperation,
    pub mesh: ExactMesh,
    /// Leaf face (flattened numbering) each face of `mesh` descends from.
    pub birth: Vec<usize>,
    /// Total number of leaf faces below this node.
    pub leaf_faces: usize,
    pub valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CsgTree {
    nodes: Vec<CsgNode>,
    config: BooleanConfig,
}

impl CsgTree {
    pub fn new(config: BooleanConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf(&mut self, mesh: &TriMesh) -> BooleanResult<NodeId> {
        self.leaf_exact(mesh.to_exact()?)
    }

    pub fn leaf_exact(&mut self, mesh: ExactMesh) -> BooleanResult<NodeId> {
        mesh.validate()?;
        let faces = mesh.faces.len();
        Ok(self.push(CsgNode {
            operation: CsgOperation::Leaf,
            mesh,
            birth: (0..faces).collect(),
            leaf_faces: faces,
            valid: true,
        }))
    }

    /// Evaluate `left op right` now and store it as a new node.
    pub fn apply(&mut self, op: BooleanType, left: NodeId, right: NodeId) -> BooleanResult<NodeId> {
        let (l, r) = (self.node(left)?, self.node(right)?);
        let out = mesh_boolean_exact(&[l.mesh.clone(), r.mesh.clone()], op, &self.config)?;

        let split = l.mesh.faces.len();
        let birth = out
            .birth
            .iter()
            .map(|&j| {
                if j < split {
                    l.birth[j]
                } else {
                    r.birth[j - split] + l.leaf_faces
                }
            })
            .collect();
        let node = CsgNode {
            operation: CsgOperation::Boolean { op, left, right },
            mesh: out.mesh,
            birth,
            leaf_faces: l.leaf_faces + r.leaf_faces,
            valid: out.valid && l.valid && r.valid,
        };
        Ok(self.push(node))
    }

    fn push(&mut self, node: CsgNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> BooleanResult<&CsgNode> {
        self.nodes.get(id).ok_or(BooleanError::MissingNode(id))
    }

    pub fn exact_mesh(&self, id: NodeId) -> BooleanResult<&ExactMesh> {
        Ok(&self.node(id)?.mesh)
    }

    /// The node's result rounded to `Real`.
    pub fn to_mesh(&self, id: NodeId) -> BooleanResult<TriMesh> {
        Ok(self.node(id)?.mesh.to_real(&self.config))
    }

    pub fn birth(&self, id: NodeId) -> BooleanResult<&[usize]> {
        Ok(&self.node(id)?.birth)
    }

    pub fn is_valid(&self, id: NodeId) -> BooleanResult<bool> {
        Ok(self.node(id)?.valid)
    }
}
