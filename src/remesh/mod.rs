//! Self-intersection resolution.
//!
//! [`remesh_self_intersections`] turns an arbitrary triangle soup into a mesh
//! whose triangles meet only along shared vertices and edges:
//!
//! 1. coincident positions are welded into one vertex and zero-area faces are
//!    dropped;
//! 2. candidate pairs come from a sweep over exact bounding boxes;
//! 3. every pair is intersected exactly ([`intersect`]);
//! 4. faces with coplanar overlaps are grouped into clusters that are
//!    triangulated together ([`triangulate`]), faces with only transversal
//!    contacts form a cluster of one, and untouched faces are copied through.
//!
//! Every output face remembers the input face it was cut from (its birth).

pub(crate) mod intersect;
pub(crate) mod triangulate;

use crate::config::BooleanConfig;
use crate::disjoint_set::DisjointSet;
use crate::exact::{ExactPoint, is_degenerate};
use crate::mesh::ExactMesh;
use hashbrown::HashMap;
use intersect::{Constraint, Contact, ExactBox, intersect_triangles};
use triangulate::{ClusterTriangulation, Piece, triangulate_cluster};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Output of [`remesh_self_intersections`].
#[derive(Debug, Clone)]
pub struct ResolvedMesh {
    pub mesh: ExactMesh,
    /// `birth[f]` is the input face output face `f` descends from.
    pub birth: Vec<usize>,
    /// Number of input face pairs that actually had to be cut.
    pub intersecting_pairs: usize,
    /// Every cluster was re-triangulated with all of its cuts. When `false`
    /// some output faces may still cross each other.
    pub complete: bool,
}

/// Welded, non-degenerate faces plus their input indices.
struct Prepared {
    vertices: Vec<ExactPoint>,
    index: HashMap<ExactPoint, usize>,
    faces: Vec<[usize; 3]>,
    source: Vec<usize>,
}

impl Prepared {
    fn new(mesh: &ExactMesh) -> Self {
        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        let mut index: HashMap<ExactPoint, usize> = HashMap::with_capacity(mesh.vertices.len());
        let remap: Vec<usize> = mesh
            .vertices
            .iter()
            .map(|p| {
                *index.entry(p.clone()).or_insert_with(|| {
                    vertices.push(p.clone());
                    vertices.len() - 1
                })
            })
            .collect();

        let mut faces = Vec::with_capacity(mesh.faces.len());
        let mut source = Vec::with_capacity(mesh.faces.len());
        for (f, face) in mesh.faces.iter().enumerate() {
            let [a, b, c] = face.map(|v| remap[v]);
            if a == b || b == c || c == a {
                continue;
            }
            if is_degenerate(&vertices[a], &vertices[b], &vertices[c]) {
                continue;
            }
            faces.push([a, b, c]);
            source.push(f);
        }

        Self {
            vertices,
            index,
            faces,
            source,
        }
    }

    fn corners(&self, f: usize) -> [ExactPoint; 3] {
        self.faces[f].map(|v| self.vertices[v].clone())
    }

    fn vertex_id(&mut self, p: &ExactPoint) -> usize {
        if let Some(&id) = self.index.get(p) {
            return id;
        }
        self.vertices.push(p.clone());
        self.index.insert(p.clone(), self.vertices.len() - 1);
        self.vertices.len() - 1
    }

    /// Pairs of faces whose closed bounding boxes overlap, `(i, j)` with `i < j`.
    fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let boxes: Vec<ExactBox> = (0..self.faces.len())
            .map(|f| ExactBox::of_triangle(&self.corners(f)))
            .collect();
        let mut order: Vec<usize> = (0..boxes.len()).collect();
        order.sort_by(|&a, &b| boxes[a].min[0].cmp(&boxes[b].min[0]));

        let mut pairs = Vec::new();
        for (k, &i) in order.iter().enumerate() {
            for &j in &order[k + 1..] {
                if boxes[j].min[0] > boxes[i].max[0] {
                    break;
                }
                if boxes[i].overlaps(&boxes[j]) {
                    pairs.push((i.min(j), i.max(j)));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn contacts(&self, config: &BooleanConfig) -> Vec<(usize, usize, Contact)> {
        let pairs = self.candidate_pairs();
        let meet = |&(i, j): &(usize, usize)| {
            intersect_triangles(&self.corners(i), &self.corners(j)).map(|c| (i, j, c))
        };

        #[cfg(feature = "parallel")]
        {
            if config.use_parallel() {
                pairs.par_iter().filter_map(meet).collect()
            } else {
                pairs.iter().filter_map(meet).collect()
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = config;
            pairs.iter().filter_map(meet).collect()
        }
    }
}

/// Input-face index pairs `(i, j)`, `i < j`, whose triangles meet in more than
/// shared corners and edges. Zero-area faces are ignored.
pub fn intersecting_face_pairs(mesh: &ExactMesh, config: &BooleanConfig) -> Vec<(usize, usize)> {
    let prepared = Prepared::new(mesh);
    let mut pairs: Vec<(usize, usize)> = prepared
        .contacts(config)
        .into_iter()
        .map(|(i, j, _)| {
            let (a, b) = (prepared.source[i], prepared.source[j]);
            (a.min(b), a.max(b))
        })
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Re-triangulate `mesh` so that no two faces cross, welding every coincident
/// position. Never fails: degenerate input only loses its zero-area faces, and
/// a cluster whose cuts could not all be recovered clears
/// [`ResolvedMesh::complete`].
pub fn remesh_self_intersections(mesh: &ExactMesh, config: &BooleanConfig) -> ResolvedMesh {
    let mut prepared = Prepared::new(mesh);
    let contacts = prepared.contacts(config);
    let face_count = prepared.faces.len();

    let mut constraints: Vec<Vec<Constraint>> = vec![Vec::new(); face_count];
    let mut clusters = DisjointSet::new(face_count);
    for (i, j, contact) in &contacts {
        if contact.coplanar {
            clusters.union(*i, *j);
        }
        constraints[*i].extend(contact.on_first.iter().cloned());
        constraints[*j].extend(contact.on_second.iter().cloned());
    }

    // members of every cluster that has something to cut, by first face
    let (labels, label_count) = clusters.labels();
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); label_count];
    for f in 0..face_count {
        members[labels[f]].push(f);
    }
    let jobs: Vec<Vec<usize>> = members
        .into_iter()
        .filter(|group| group.len() > 1 || !constraints[group[0]].is_empty())
        .collect();
    debug!(
        faces = face_count,
        contacts = contacts.len(),
        clusters = jobs.len(),
        "self-intersection search finished"
    );

    let cut = |group: &Vec<usize>| -> ClusterTriangulation {
        let faces: Vec<[ExactPoint; 3]> = group.iter().map(|&f| prepared.corners(f)).collect();
        let local: Vec<Constraint> = group.iter().flat_map(|&f| constraints[f].iter().cloned()).collect();
        let cluster = triangulate_cluster(&faces, &local);
        ClusterTriangulation {
            pieces: cluster
                .pieces
                .into_iter()
                .map(|piece| Piece {
                    face: group[piece.face],
                    corners: piece.corners,
                })
                .collect(),
            complete: cluster.complete,
        }
    };
    let clusters: Vec<ClusterTriangulation> = {
        #[cfg(feature = "parallel")]
        {
            if config.use_parallel() {
                jobs.par_iter().map(cut).collect()
            } else {
                jobs.iter().map(cut).collect()
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            jobs.iter().map(cut).collect()
        }
    };

    let mut per_face: Vec<Vec<[ExactPoint; 3]>> = vec![Vec::new(); face_count];
    let mut is_cut = vec![false; face_count];
    let mut complete = true;
    for (group, cluster) in jobs.iter().zip(clusters) {
        for &f in group {
            is_cut[f] = true;
        }
        if !cluster.complete {
            warn!(first_face = prepared.source[group[0]], faces = group.len(), "cluster left partially cut");
            complete = false;
        }
        for piece in cluster.pieces {
            per_face[piece.face].push(piece.corners);
        }
    }

    let mut faces = Vec::with_capacity(face_count);
    let mut birth = Vec::with_capacity(face_count);
    for f in 0..face_count {
        if !is_cut[f] {
            faces.push(prepared.faces[f]);
            birth.push(prepared.source[f]);
            continue;
        }
        for corners in std::mem::take(&mut per_face[f]) {
            let face = [
                prepared.vertex_id(&corners[0]),
                prepared.vertex_id(&corners[1]),
                prepared.vertex_id(&corners[2]),
            ];
            faces.push(face);
            birth.push(prepared.source[f]);
        }
    }

    let intersecting_pairs = contacts.len();
    debug!(input = mesh.faces.len(), output = faces.len(), "resolved mesh");
    ResolvedMesh {
        mesh: ExactMesh::new(prepared.vertices, faces),
        birth,
        intersecting_pairs,
        complete,
    }
}
