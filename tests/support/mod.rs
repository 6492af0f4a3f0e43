//! Test support library
//! Provides mesh fixtures & comparison helpers shared by the integration tests.
#![allow(dead_code)]

use meshwind::{ExactMesh, ExactPoint, Real, TriMesh};
use nalgebra::Point3;
use num_bigint::BigInt;
use num_rational::BigRational;

/// Axis-aligned box `[0, size]^3` moved by `offset`, outward-facing triangles.
pub fn cuboid(size: [Real; 3], offset: [Real; 3]) -> TriMesh {
    let [sx, sy, sz] = size;
    let [ox, oy, oz] = offset;
    let corners = [
        [0.0, 0.0, 0.0],
        [sx, 0.0, 0.0],
        [sx, sy, 0.0],
        [0.0, sy, 0.0],
        [0.0, 0.0, sz],
        [sx, 0.0, sz],
        [sx, sy, sz],
        [0.0, sy, sz],
    ];
    TriMesh::new(
        corners.iter().map(|c| Point3::new(c[0] + ox, c[1] + oy, c[2] + oz)).collect(),
        vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ],
    )
}

/// Unit cube moved by `offset`.
pub fn cube(offset: [Real; 3]) -> TriMesh {
    cuboid([1.0, 1.0, 1.0], offset)
}

/// Corner tetrahedron with legs of length `size`, outward-facing.
pub fn tetrahedron(size: i64, offset: [i64; 3]) -> ExactMesh {
    let [x, y, z] = offset;
    ExactMesh::new(
        vec![
            ExactPoint::from_integers(x, y, z),
            ExactPoint::from_integers(x + size, y, z),
            ExactPoint::from_integers(x, y + size, z),
            ExactPoint::from_integers(x, y, z + size),
        ],
        vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
    )
}

/// Exact rational `num / den`.
pub fn ratio(num: i64, den: i64) -> BigRational {
    BigRational::new(BigInt::from(num), BigInt::from(den))
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// Every undirected edge is used exactly twice, once in each direction.
pub fn is_closed_and_oriented<P>(mesh: &meshwind::Mesh<P>) -> bool {
    let mut directed = hashbrown::HashMap::new();
    for face in &mesh.faces {
        for c in 0..3 {
            *directed.entry((face[c], face[(c + 1) % 3])).or_insert(0usize) += 1;
        }
    }
    directed
        .iter()
        .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
}

/// Every directed edge is used as often as its reverse. Holds for any
/// boundary of a union of cells, including non-manifold ones like a xor.
pub fn is_edge_balanced<P>(mesh: &meshwind::Mesh<P>) -> bool {
    let mut directed = hashbrown::HashMap::new();
    for face in &mesh.faces {
        for c in 0..3 {
            *directed.entry((face[c], face[(c + 1) % 3])).or_insert(0usize) += 1;
        }
    }
    directed
        .iter()
        .all(|(&(a, b), &count)| directed.get(&(b, a)) == Some(&count))
}

/// No two faces share a vertex triple and every vertex belongs to some face.
pub fn is_compact<P>(mesh: &meshwind::Mesh<P>) -> bool {
    let mut triples = hashbrown::HashSet::new();
    let mut used = vec![false; mesh.vertices.len()];
    for face in &mesh.faces {
        let mut key = *face;
        key.sort_unstable();
        if !triples.insert(key) {
            return false;
        }
        for &v in face {
            used[v] = true;
        }
    }
    used.into_iter().all(|u| u)
}

/// The vertex positions, sorted.
pub fn sorted_vertices(mesh: &ExactMesh) -> Vec<ExactPoint> {
    let mut vertices = mesh.vertices.clone();
    vertices.sort();
    vertices
}

/// Every face as its corner positions, rotated to start at the smallest
/// corner so orientation is kept, then sorted.
pub fn sorted_face_corners(mesh: &ExactMesh) -> Vec<[ExactPoint; 3]> {
    let mut corners: Vec<[ExactPoint; 3]> = mesh
        .faces
        .iter()
        .map(|face| {
            let [a, b, c] = face.map(|v| mesh.vertices[v].clone());
            if a <= b && a <= c {
                [a, b, c]
            } else if b <= c {
                [b, c, a]
            } else {
                [c, a, b]
            }
        })
        .collect();
    corners.sort();
    corners
}
