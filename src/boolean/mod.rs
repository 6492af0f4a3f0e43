//! Boolean operations on triangle meshes.
//!
//! Every entry point runs the same pipeline on the concatenation of its
//! inputs: exact self-intersection resolution, patch and cell extraction,
//! winding-number propagation, per-face classification, duplicate face
//! cancellation, and compaction.
//!
//! ```
//! use meshwind::{BooleanConfig, BooleanType, TriMesh, mesh_boolean};
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
//! let out = mesh_boolean(&tet(0.0), &tet(5.0), BooleanType::Union, &BooleanConfig::default()).unwrap();
//! assert!(out.valid);
//! assert_eq!(out.mesh.face_count(), 8);
//! ```

pub mod duplicates;

pub use duplicates::{Deduplicated, resolve_duplicated_faces};

use crate::config::BooleanConfig;
use crate::errors::{BooleanError, BooleanResult};
use crate::mesh::{ExactMesh, TriMesh, combine, cumsum, remove_unreferenced};
use crate::remesh::remesh_self_intersections;
use crate::topology::Topology;
use crate::winding::propagate_winding_numbers;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The named Boolean operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanType {
    Union,
    Intersect,
    /// First input minus the union of all others.
    Minus,
    Xor,
    /// Keep everything; only remove self-intersections.
    Resolve,
}

impl BooleanType {
    pub const ALL: [BooleanType; 5] = [
        BooleanType::Union,
        BooleanType::Intersect,
        BooleanType::Minus,
        BooleanType::Xor,
        BooleanType::Resolve,
    ];

    /// Parse-or-panic accessor.
    ///
    /// # Panics
    ///
    /// When `name` is not a Boolean operation; use [`str::parse`] to handle
    /// that case instead.
    pub fn from_name(name: &str) -> Self {
        match name.parse() {
            Ok(op) => op,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn winding_op(self) -> WindingNumberOp {
        match self {
            BooleanType::Union => WindingNumberOp::Union,
            BooleanType::Intersect => WindingNumberOp::Intersect,
            BooleanType::Minus => WindingNumberOp::Minus,
            BooleanType::Xor => WindingNumberOp::Xor,
            BooleanType::Resolve => WindingNumberOp::Resolve,
        }
    }

    pub fn keep_rule(self) -> KeepRule {
        match self {
            BooleanType::Resolve => KeepRule::All,
            _ => KeepRule::Inside,
        }
    }
}

impl FromStr for BooleanType {
    type Err = BooleanError;

    /// Case-insensitive, with the usual aliases (`unite`, `i`, `subtract`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" | "unite" | "u" => Ok(BooleanType::Union),
            "intersect" | "intersection" | "i" => Ok(BooleanType::Intersect),
            "minus" | "subtract" | "difference" | "m" => Ok(BooleanType::Minus),
            "xor" | "symmetric difference" | "x" => Ok(BooleanType::Xor),
            "resolve" => Ok(BooleanType::Resolve),
            _ => Err(BooleanError::UnknownOperation(s.to_string())),
        }
    }
}

impl fmt::Display for BooleanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BooleanType::Union => "union",
            BooleanType::Intersect => "intersect",
            BooleanType::Minus => "minus",
            BooleanType::Xor => "xor",
            BooleanType::Resolve => "resolve",
        };
        f.write_str(name)
    }
}

/// Maps the winding numbers of a point (one per input) to "inside the result".
#[derive(Clone)]
pub enum WindingNumberOp {
    Union,
    Intersect,
    Minus,
    Xor,
    Resolve,
    Custom(Arc<dyn Fn(&[i32]) -> bool + Send + Sync>),
}

impl WindingNumberOp {
    pub fn custom(f: impl Fn(&[i32]) -> bool + Send + Sync + 'static) -> Self {
        WindingNumberOp::Custom(Arc::new(f))
    }

    pub fn apply(&self, windings: &[i32]) -> bool {
        match self {
            WindingNumberOp::Union => windings.iter().any(|&w| w > 0),
            WindingNumberOp::Intersect => windings.iter().all(|&w| w > 0),
            WindingNumberOp::Minus => match windings.split_first() {
                Some((&first, rest)) => first > 0 && rest.iter().all(|&w| w <= 0),
                None => false,
            },
            WindingNumberOp::Xor => windings.iter().filter(|&&w| w > 0).count() % 2 == 1,
            WindingNumberOp::Resolve => true,
            WindingNumberOp::Custom(f) => f(windings),
        }
    }
}

impl fmt::Debug for WindingNumberOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindingNumberOp::Union => f.write_str("Union"),
            WindingNumberOp::Intersect => f.write_str("Intersect"),
            WindingNumberOp::Minus => f.write_str("Minus"),
            WindingNumberOp::Xor => f.write_str("Xor"),
            WindingNumberOp::Resolve => f.write_str("Resolve"),
            WindingNumberOp::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What happens to one face of the resolved mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceKeep {
    /// Keep with its original orientation (`+1`).
    Keep,
    /// Keep with reversed orientation (`-1`).
    Flip,
    /// Drop (`0`).
    Discard,
}

impl FaceKeep {
    pub const fn sign(self) -> i8 {
        match self {
            FaceKeep::Keep => 1,
            FaceKeep::Flip => -1,
            FaceKeep::Discard => 0,
        }
    }
}

/// Decides a face's fate from the classification of the space above
/// (`outside`, along the normal) and below (`inside`) it.
#[derive(Clone)]
pub enum KeepRule {
    /// Keep faces separating the result from its complement, oriented outward.
    Inside,
    /// Keep every face as it is.
    All,
    Custom(Arc<dyn Fn(bool, bool) -> FaceKeep + Send + Sync>),
}

impl KeepRule {
    pub fn custom(f: impl Fn(bool, bool) -> FaceKeep + Send + Sync + 'static) -> Self {
        KeepRule::Custom(Arc::new(f))
    }

    pub fn apply(&self, above: bool, below: bool) -> FaceKeep {
        match self {
            KeepRule::Inside => match (above, below) {
                (false, true) => FaceKeep::Keep,
                (true, false) => FaceKeep::Flip,
                _ => FaceKeep::Discard,
            },
            KeepRule::All => FaceKeep::Keep,
            KeepRule::Custom(f) => f(above, below),
        }
    }
}

impl fmt::Debug for KeepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepRule::Inside => f.write_str("Inside"),
            KeepRule::All => f.write_str("All"),
            KeepRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sizes seen along the pipeline, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanStats {
    pub input_faces: usize,
    pub intersecting_pairs: usize,
    pub resolved_faces: usize,
    pub patches: usize,
    pub cells: usize,
    pub output_faces: usize,
}

/// Result of a Boolean operation in exact coordinates.
#[derive(Debug, Clone, Default)]
pub struct ExactBooleanOutput {
    pub mesh: ExactMesh,
    /// Input face (in concatenated numbering) each output face came from.
    pub birth: Vec<usize>,
    /// `false` when the inputs did not bound solids or a self-intersection
    /// could not be fully resolved; the mesh is best effort.
    pub valid: bool,
    pub stats: BooleanStats,
}

/// Result of a Boolean operation.
#[derive(Debug, Clone, Default)]
pub struct BooleanOutput {
    pub mesh: TriMesh,
    /// Input face (in concatenated numbering) each output face came from.
    pub birth: Vec<usize>,
    /// `false` when the inputs did not bound solids or a self-intersection
    /// could not be fully resolved; the mesh is best effort.
    pub valid: bool,
    pub stats: BooleanStats,
}

impl ExactBooleanOutput {
    pub fn to_real(&self, config: &BooleanConfig) -> BooleanOutput {
        BooleanOutput {
            mesh: self.mesh.to_real(config),
            birth: self.birth.clone(),
            valid: self.valid,
            stats: self.stats,
        }
    }
}

/// Two-mesh Boolean.
pub fn mesh_boolean(a: &TriMesh, b: &TriMesh, op: BooleanType, config: &BooleanConfig) -> BooleanResult<BooleanOutput> {
    mesh_boolean_n(&[a.clone(), b.clone()], op, config)
}

/// Two-mesh Boolean with the operation given by name. An unknown name is the
/// soft failure [`BooleanError::UnknownOperation`].
pub fn mesh_boolean_str(a: &TriMesh, b: &TriMesh, op: &str, config: &BooleanConfig) -> BooleanResult<BooleanOutput> {
    let op = op.parse::<BooleanType>().inspect_err(|err| warn!(%err, "rejected Boolean operation"))?;
    mesh_boolean(a, b, op, config)
}

/// N-ary Boolean: the operation sees one winding number per input.
pub fn mesh_boolean_n(meshes: &[TriMesh], op: BooleanType, config: &BooleanConfig) -> BooleanResult<BooleanOutput> {
    let combined = combine(meshes);
    mesh_boolean_custom(
        &combined.mesh,
        &combined.face_sizes,
        &op.winding_op(),
        &op.keep_rule(),
        config,
    )
}

/// Lowest-level floating point entry: `combined` holds the inputs back to
/// back, `face_sizes[i]` faces each, and the caller supplies classification.
pub fn mesh_boolean_custom(
    combined: &TriMesh,
    face_sizes: &[usize],
    op: &WindingNumberOp,
    keep: &KeepRule,
    config: &BooleanConfig,
) -> BooleanResult<BooleanOutput> {
    let exact = combined.to_exact()?;
    let out = boolean_pipeline(&exact, face_sizes, op, keep, config)?;
    Ok(out.to_real(config))
}

/// Exact N-ary Boolean; nothing is rounded.
pub fn mesh_boolean_exact(meshes: &[ExactMesh], op: BooleanType, config: &BooleanConfig) -> BooleanResult<ExactBooleanOutput> {
    let combined = combine(meshes);
    combined.mesh.validate()?;
    boolean_pipeline(&combined.mesh, &combined.face_sizes, &op.winding_op(), &op.keep_rule(), config)
}

/// Exact counterpart of [`mesh_boolean_custom`].
pub fn mesh_boolean_custom_exact(
    combined: &ExactMesh,
    face_sizes: &[usize],
    op: &WindingNumberOp,
    keep: &KeepRule,
    config: &BooleanConfig,
) -> BooleanResult<ExactBooleanOutput> {
    combined.validate()?;
    boolean_pipeline(combined, face_sizes, op, keep, config)
}

fn boolean_pipeline(
    combined: &ExactMesh,
    face_sizes: &[usize],
    op: &WindingNumberOp,
    keep: &KeepRule,
    config: &BooleanConfig,
) -> BooleanResult<ExactBooleanOutput> {
    let expected: usize = face_sizes.iter().sum();
    if expected != combined.faces.len() {
        return Err(BooleanError::LengthMismatch {
            expected,
            actual: combined.faces.len(),
        });
    }

    // input index of every concatenated face
    let offsets = cumsum(face_sizes);
    let mut input_of = Vec::with_capacity(combined.faces.len());
    for i in 0..face_sizes.len() {
        input_of.extend(std::iter::repeat_n(i, offsets[i + 1] - offsets[i]));
    }

    let resolved = remesh_self_intersections(combined, config);
    let topology = Topology::build(&resolved.mesh, config);
    let labels: Vec<usize> = resolved.birth.iter().map(|&j| input_of[j]).collect();
    debug!(
        resolved = resolved.mesh.faces.len(),
        patches = topology.patches.count,
        cells = topology.cells.num_cells,
        "mesh arrangement built"
    );

    let windings = propagate_winding_numbers(
        &resolved.mesh.faces,
        &topology.edges,
        &topology.patches,
        &topology.cells,
        &labels,
        face_sizes.len(),
    );

    let mut selected = Vec::new();
    let mut selected_birth = Vec::new();
    for (f, face) in resolved.mesh.faces.iter().enumerate() {
        let above = op.apply(&windings.faces.above_all(f));
        let below = op.apply(&windings.faces.below_all(f));
        let oriented = match keep.apply(above, below) {
            FaceKeep::Keep => *face,
            FaceKeep::Flip => [face[0], face[2], face[1]],
            FaceKeep::Discard => continue,
        };
        selected.push(oriented);
        selected_birth.push(resolved.birth[f]);
    }

    let deduplicated = resolve_duplicated_faces(&selected)?;
    let birth: Vec<usize> = deduplicated.source.iter().map(|&k| selected_birth[k]).collect();
    let compacted = remove_unreferenced(&resolved.mesh.vertices, &deduplicated.faces)?;

    let valid = windings.valid && resolved.complete;
    let stats = BooleanStats {
        input_faces: combined.faces.len(),
        intersecting_pairs: resolved.intersecting_pairs,
        resolved_faces: resolved.mesh.faces.len(),
        patches: topology.patches.count,
        cells: topology.cells.num_cells,
        output_faces: compacted.mesh.faces.len(),
    };
    info!(
        op = ?op,
        inputs = face_sizes.len(),
        input_faces = stats.input_faces,
        output_faces = stats.output_faces,
        valid,
        "mesh boolean finished"
    );
    if !windings.valid {
        warn!("inputs do not induce a piecewise-constant winding number field");
    }
    if !resolved.complete {
        warn!("self-intersections were only partially resolved");
    }

    Ok(ExactBooleanOutput {
        mesh: compacted.mesh,
        birth,
        valid,
        stats,
    })
}
