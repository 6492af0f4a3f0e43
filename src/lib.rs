//! Exact **Boolean operations on triangle meshes**: *union*, *intersection*,
//! *difference*, *symmetric difference*, and plain self-intersection
//! *resolution* of any number of closed (possibly non-manifold, possibly
//! self-intersecting) meshes.
//!
//! Inputs are cast losslessly to rational coordinates, every geometric
//! decision is made exactly, and the result is classified by integer winding
//! numbers: a face survives when the space on its two sides is classified
//! differently by the chosen operation.
//!
//! Pipeline: [`remesh`] (self-intersection resolution) → [`topology`]
//! (unique edges, manifold patches, cells) → [`winding`] (winding-number
//! propagation) → [`boolean`] (classification, duplicate cancellation, output).
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon for the pairwise intersection tests, the per-cluster
//!   re-triangulation and the final cast

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod boolean;
pub mod config;
pub mod csg_tree;
pub mod errors;
pub mod exact;
pub mod float_types;
pub mod mesh;
pub mod remesh;
pub mod topology;
pub mod winding;

mod disjoint_set;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use boolean::{
    BooleanOutput, BooleanStats, BooleanType, ExactBooleanOutput, FaceKeep, KeepRule, WindingNumberOp,
    mesh_boolean, mesh_boolean_custom, mesh_boolean_custom_exact, mesh_boolean_exact, mesh_boolean_n,
    mesh_boolean_str, resolve_duplicated_faces,
};
pub use config::BooleanConfig;
pub use csg_tree::{CsgTree, NodeId};
pub use errors::{BooleanError, BooleanResult};
pub use exact::{Exact, ExactPoint, assign_scalar, cast_to_exact};
pub use float_types::Real;
pub use mesh::{ExactMesh, Mesh, TriMesh, combine, cumsum, remove_unreferenced};
pub use remesh::{ResolvedMesh, intersecting_face_pairs, remesh_self_intersections};
pub use winding::{FaceWindings, WindingNumbers, propagate_winding_numbers};
