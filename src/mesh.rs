//! Indexed triangle meshes over floating point or exact coordinates, plus the
//! small buffer utilities the pipeline shares (`combine`, `cumsum`,
//! `remove_unreferenced`).

use crate::config::BooleanConfig;
use crate::errors::{BooleanError, BooleanResult};
use crate::exact::{ExactPoint, cast_to_exact, orient3d_value};
use crate::float_types::Real;
use nalgebra::Point3;
use num_traits::Zero;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A point cloud plus a triangle index buffer.
///
/// `P` is the point type: [`Point3<Real>`] at the public boundary and
/// [`ExactPoint`] inside the pipeline. Faces are `[v0, v1, v2]`; their winding
/// defines orientation and must be consistent per input mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<P> {
    pub vertices: Vec<P>,
    pub faces: Vec<[usize; 3]>,
}

/// Floating point mesh used at the API boundary.
pub type TriMesh = Mesh<Point3<Real>>;

/// Exact mesh used between pipeline stages.
pub type ExactMesh = Mesh<ExactPoint>;

impl<P> Default for Mesh<P> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }
}

impl<P> Mesh<P> {
    pub const fn new(vertices: Vec<P>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Check that every face index points at an existing vertex.
    pub fn validate(&self) -> BooleanResult<()> {
        let vertex_count = self.vertices.len();
        for (face, indices) in self.faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= vertex_count) {
                return Err(BooleanError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

impl TriMesh {
    /// Exact copy of this mesh. Fails on NaN/infinite coordinates and on
    /// out-of-range face indices.
    pub fn to_exact(&self) -> BooleanResult<ExactMesh> {
        self.validate()?;
        let vertices = self
            .vertices
            .iter()
            .enumerate()
            .map(|(vertex, p)| cast_to_exact(p).ok_or(BooleanError::NonFiniteCoordinate { vertex }))
            .collect::<BooleanResult<Vec<_>>>()?;
        Ok(ExactMesh::new(vertices, self.faces.clone()))
    }

    /// Signed enclosed volume (divergence theorem). Positive for closed meshes
    /// with outward-facing triangles.
    ///
    /// # Panics
    /// When a face index is out of range. Meshes that passed
    /// [`Mesh::validate`], and every mesh the Boolean entry points return, are
    /// safe.
    pub fn signed_volume(&self) -> Real {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (self.vertices[a].coords, self.vertices[b].coords, self.vertices[c].coords);
                a.dot(&b.cross(&c))
            })
            .sum::<Real>()
            / 6.0
    }
}

impl ExactMesh {
    /// Cast every vertex back to `Real` (see [`crate::exact::assign_scalar`]).
    pub fn to_real(&self, config: &BooleanConfig) -> TriMesh {
        let exact_output = config.exact_output;
        let vertices: Vec<Point3<Real>> = {
            #[cfg(feature = "parallel")]
            {
                if config.use_parallel() {
                    self.vertices.par_iter().map(|p| p.to_real(exact_output)).collect()
                } else {
                    self.vertices.iter().map(|p| p.to_real(exact_output)).collect()
                }
            }
            #[cfg(not(feature = "parallel"))]
            {
                self.vertices.iter().map(|p| p.to_real(exact_output)).collect()
            }
        };
        TriMesh::new(vertices, self.faces.clone())
    }

    /// Six times the signed volume, computed exactly.
    ///
    /// # Panics
    /// When a face index is out of range, like [`TriMesh::signed_volume`].
    pub fn signed_volume_x6(&self) -> crate::exact::Exact {
        let origin = ExactPoint::from_integers(0, 0, 0);
        self.faces.iter().fold(crate::exact::Exact::zero(), |acc, &[a, b, c]| {
            acc + orient3d_value(&origin, &self.vertices[a], &self.vertices[b], &self.vertices[c])
        })
    }
}

/// Result of [`combine`]: the concatenated mesh and where each input landed.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined<P> {
    pub mesh: Mesh<P>,
    pub vertex_sizes: Vec<usize>,
    pub face_sizes: Vec<usize>,
}

/// Concatenate meshes, offsetting face indices so every input keeps pointing
/// at its own vertices. `sum(vertex_sizes) == mesh.vertex_count()` and
/// `sum(face_sizes) == mesh.face_count()`.
pub fn combine<'a, P: Clone + 'a>(meshes: impl IntoIterator<Item = &'a Mesh<P>>) -> Combined<P> {
    let mut combined = Combined {
        mesh: Mesh::default(),
        vertex_sizes: Vec::new(),
        face_sizes: Vec::new(),
    };
    for mesh in meshes {
        let offset = combined.mesh.vertices.len();
        combined.mesh.vertices.extend(mesh.vertices.iter().cloned());
        combined
            .mesh
            .faces
            .extend(mesh.faces.iter().map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]));
        combined.vertex_sizes.push(mesh.vertices.len());
        combined.face_sizes.push(mesh.faces.len());
    }
    combined
}

/// Running sum with a leading zero: `cumsum(&[2, 3]) == [0, 2, 5]`.
/// Entry `i` is the offset of input `i` in a concatenated buffer.
pub fn cumsum(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut total = 0;
    offsets.push(0);
    for &size in sizes {
        total += size;
        offsets.push(total);
    }
    offsets
}

/// Output of [`remove_unreferenced`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compacted<P> {
    pub mesh: Mesh<P>,
    /// `old_to_new[v]` is the new index of old vertex `v`, if it survived.
    pub old_to_new: Vec<Option<usize>>,
    /// `new_to_old[v]` is the old index of new vertex `v`.
    pub new_to_old: Vec<usize>,
}

/// Drop vertices no face uses. Surviving vertices keep their relative order.
/// Fails with [`BooleanError::FaceIndexOutOfRange`] when a face points past
/// `vertices`.
pub fn remove_unreferenced<P: Clone>(vertices: &[P], faces: &[[usize; 3]]) -> BooleanResult<Compacted<P>> {
    let vertex_count = vertices.len();
    let mut used = vec![false; vertex_count];
    for (face, indices) in faces.iter().enumerate() {
        for &index in indices {
            let slot = used.get_mut(index).ok_or(BooleanError::FaceIndexOutOfRange {
                face,
                index,
                vertex_count,
            })?;
            *slot = true;
        }
    }

    let mut old_to_new = vec![None; vertices.len()];
    let mut new_to_old = Vec::new();
    for (old, _) in used.iter().enumerate().filter(|(_, u)| **u) {
        old_to_new[old] = Some(new_to_old.len());
        new_to_old.push(old);
    }

    // every index below is referenced, so the lookup is populated
    let remap = |v: usize| old_to_new[v].unwrap_or(v);
    Ok(Compacted {
        mesh: Mesh::new(
            new_to_old.iter().map(|&old| vertices[old].clone()).collect(),
            faces.iter().map(|f| [remap(f[0]), remap(f[1]), remap(f[2])]).collect(),
        ),
        old_to_new,
        new_to_old,
    })
}
