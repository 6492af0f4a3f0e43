//! Constrained triangulation of a planar cluster of faces.
//!
//! All faces of a cluster share one supporting plane. Their edges and every
//! constraint landing on them are noded against each other, inserted into a
//! triangulation of a large enclosing triangle, and recovered as edges by
//! flipping (Sloan's queue). Each resulting triangle is then handed to every
//! cluster face that covers it, so overlapping coplanar faces receive exactly
//! the same pieces.
//!
//! Points are located by walking from the last created triangle and the edges
//! a constraint crosses are found by walking along it, so the work per
//! insertion follows the local neighbourhood. Every step runs in index order,
//! which makes the output a pure function of the input.

use super::intersect::Constraint;
use crate::exact::{
    Exact, ExactPoint, ExactPoint2, dominant_axis, int, orient2d, orient2d_value, triangle_normal,
};
use hashbrown::HashMap;
use num_traits::{Signed, Zero};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::warn;

/// A piece of the cluster triangulation assigned to `face` (local index).
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub face: usize,
    pub corners: [ExactPoint; 3],
}

/// Output of [`triangulate_cluster`].
#[derive(Debug, Clone)]
pub(crate) struct ClusterTriangulation {
    pub pieces: Vec<Piece>,
    /// `false` when a point could not be placed or a constraint could not be
    /// recovered. The pieces still tile the faces but may cross a constraint.
    pub complete: bool,
}

/// Triangulate `faces` (coplanar, non-degenerate) against `constraints`.
pub(crate) fn triangulate_cluster(faces: &[[ExactPoint; 3]], constraints: &[Constraint]) -> ClusterTriangulation {
    let Some(first) = faces.first() else {
        return ClusterTriangulation {
            pieces: Vec::new(),
            complete: true,
        };
    };
    let axis = dominant_axis(&triangle_normal(&first[0], &first[1], &first[2]));

    let mut points = PointSet::new(axis);
    let mut segments: Vec<(usize, usize)> = Vec::new();
    for face in faces {
        for i in 0..3 {
            let a = points.insert(&face[i]);
            let b = points.insert(&face[(i + 1) % 3]);
            segments.push((a, b));
        }
    }
    for constraint in constraints {
        match constraint {
            Constraint::Point(p) => {
                points.insert(p);
            },
            Constraint::Segment(p, q) => {
                let a = points.insert(p);
                let b = points.insert(q);
                segments.push((a, b));
            },
        }
    }
    let segments = node_segments(&mut points, segments);

    let mut mesh = Triangulation::enclosing(&points.flat);
    for (id, p) in points.flat.iter().enumerate() {
        mesh.insert_point(id + SUPER, p);
    }
    for &(a, b) in &segments {
        mesh.insert_edge(a + SUPER, b + SUPER);
    }

    let orientations: Vec<Ordering> = faces
        .iter()
        .map(|f| {
            let [a, b, c] = f.clone().map(|p| p.project(axis));
            orient2d(&a, &b, &c)
        })
        .collect();

    let mut pieces = Vec::new();
    for tri in mesh.alive() {
        if tri.iter().any(|&v| v < SUPER) {
            continue;
        }
        let [a, b, c] = tri.map(|v| v - SUPER);
        let three = int(3);
        let centroid = ExactPoint2::new(
            (&points.flat[a][0] + &points.flat[b][0] + &points.flat[c][0]) / &three,
            (&points.flat[a][1] + &points.flat[b][1] + &points.flat[c][1]) / &three,
        );
        for (face, corners) in faces.iter().enumerate() {
            let positive = orientations[face] == Ordering::Greater;
            let [f0, f1, f2] = corners.clone().map(|p| p.project(axis));
            let inside = [(&f0, &f1), (&f1, &f2), (&f2, &f0)].iter().all(|(u, v)| {
                let side = orient2d(u, v, &centroid);
                side == Ordering::Equal || (side == Ordering::Greater) == positive
            });
            if !inside {
                continue;
            }
            let (pa, pb, pc) = (
                points.exact[a].clone(),
                points.exact[b].clone(),
                points.exact[c].clone(),
            );
            let corners = if positive { [pa, pb, pc] } else { [pa, pc, pb] };
            pieces.push(Piece { face, corners });
        }
    }
    ClusterTriangulation {
        pieces,
        complete: mesh.complete,
    }
}

/// Number of enclosing-triangle vertices in front of the real ones.
const SUPER: usize = 3;

/// Deduplicated exact points with their projections.
struct PointSet {
    axis: usize,
    exact: Vec<ExactPoint>,
    flat: Vec<ExactPoint2>,
    index: HashMap<ExactPoint, usize>,
}

impl PointSet {
    fn new(axis: usize) -> Self {
        Self {
            axis,
            exact: Vec::new(),
            flat: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, p: &ExactPoint) -> usize {
        if let Some(&id) = self.index.get(p) {
            return id;
        }
        let id = self.exact.len();
        self.exact.push(p.clone());
        self.flat.push(p.project(self.axis));
        self.index.insert(p.clone(), id);
        id
    }
}

/// Dominant coordinate of the 2D segment `ab`, used to order points along it.
fn segment_axis(a: &ExactPoint2, b: &ExactPoint2) -> usize {
    let dx = (&b[0] - &a[0]).abs();
    let dy = (&b[1] - &a[1]).abs();
    if dy > dx { 1 } else { 0 }
}

/// `p` lies on the open segment `ab`.
fn strictly_inside(a: &ExactPoint2, b: &ExactPoint2, p: &ExactPoint2) -> bool {
    if orient2d(a, b, p) != Ordering::Equal {
        return false;
    }
    let k = segment_axis(a, b);
    let (lo, hi) = if a[k] < b[k] { (&a[k], &b[k]) } else { (&b[k], &a[k]) };
    *lo < p[k] && p[k] < *hi
}

/// Split every segment at every point where it meets another segment or an
/// isolated point, so that the result only meets at shared endpoints.
fn node_segments(points: &mut PointSet, segments: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut unique: Vec<(usize, usize)> = Vec::with_capacity(segments.len());
    let mut seen = hashbrown::HashSet::new();
    for (a, b) in segments {
        if a != b && seen.insert((a.min(b), a.max(b))) {
            unique.push((a, b));
        }
    }

    let mut splits: Vec<Vec<usize>> = vec![Vec::new(); unique.len()];
    for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
            let (a, b) = unique[i];
            let (c, d) = unique[j];
            let (pa, pb, pc, pd) = (
                &points.flat[a],
                &points.flat[b],
                &points.flat[c],
                &points.flat[d],
            );
            let o1 = orient2d(pa, pb, pc);
            let o2 = orient2d(pa, pb, pd);
            let o3 = orient2d(pc, pd, pa);
            let o4 = orient2d(pc, pd, pb);
            let proper = o1 != Ordering::Equal
                && o2 != Ordering::Equal
                && o1 != o2
                && o3 != Ordering::Equal
                && o4 != Ordering::Equal
                && o3 != o4;
            if proper {
                let num = orient2d_value(pc, pd, pa);
                let t = &num / (&num - orient2d_value(pc, pd, pb));
                let crossing = points.exact[a].lerp(&points.exact[b], &t);
                let id = points.insert(&crossing);
                splits[i].push(id);
                splits[j].push(id);
            }
        }
    }

    // touching endpoints, collinear overlaps and isolated points
    for (i, &(a, b)) in unique.iter().enumerate() {
        for p in 0..points.flat.len() {
            if p != a && p != b && strictly_inside(&points.flat[a], &points.flat[b], &points.flat[p]) {
                splits[i].push(p);
            }
        }
    }

    let mut noded = Vec::new();
    let mut noded_seen = hashbrown::HashSet::new();
    for (i, &(a, b)) in unique.iter().enumerate() {
        let k = segment_axis(&points.flat[a], &points.flat[b]);
        let ascending = points.flat[a][k] < points.flat[b][k];
        let mut chain = std::mem::take(&mut splits[i]);
        chain.sort_by(|&u, &v| {
            let order = points.flat[u][k].cmp(&points.flat[v][k]);
            if ascending { order } else { order.reverse() }
        });
        chain.dedup();
        let mut prev = a;
        for v in chain.into_iter().chain(std::iter::once(b)) {
            if noded_seen.insert((prev.min(v), prev.max(v))) {
                noded.push((prev, v));
            }
            prev = v;
        }
    }
    noded
}

/// Triangle soup with a directed-edge index. Vertex ids `0..3` are the
/// enclosing triangle, `3..` are `PointSet` ids shifted by [`SUPER`].
struct Triangulation {
    coords: Vec<ExactPoint2>,
    triangles: Vec<[usize; 3]>,
    alive: Vec<bool>,
    edges: HashMap<(usize, usize), usize>,
    /// Some live triangle around each vertex.
    incident: Vec<usize>,
    /// Most recently created triangle, where point location starts.
    last: usize,
    complete: bool,
}

impl Triangulation {
    /// Counter-clockwise triangle strictly containing every point.
    fn enclosing(points: &[ExactPoint2]) -> Self {
        let mut min = [Exact::zero(), Exact::zero()];
        let mut max = [Exact::zero(), Exact::zero()];
        for (i, p) in points.iter().enumerate() {
            for k in 0..2 {
                if i == 0 || p[k] < min[k] {
                    min[k] = p[k].clone();
                }
                if i == 0 || p[k] > max[k] {
                    max[k] = p[k].clone();
                }
            }
        }
        let span = std::cmp::max(&max[0] - &min[0], &max[1] - &min[1]) + int(1);
        let far = &span * int(4);
        let corners = [
            ExactPoint2::new(&min[0] - &span, &min[1] - &span),
            ExactPoint2::new(&min[0] + &far, &min[1] - &span),
            ExactPoint2::new(&min[0] - &span, &min[1] + &far),
        ];

        let mut coords = corners.to_vec();
        coords.extend(points.iter().cloned());
        let mut mesh = Self {
            incident: vec![0; coords.len()],
            coords,
            triangles: Vec::new(),
            alive: Vec::new(),
            edges: HashMap::new(),
            last: 0,
            complete: true,
        };
        mesh.add([0, 1, 2]);
        mesh
    }

    fn alive(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles
            .iter()
            .zip(&self.alive)
            .filter(|(_, alive)| **alive)
            .map(|(t, _)| *t)
    }

    fn add(&mut self, tri: [usize; 3]) -> usize {
        let id = self.triangles.len();
        for i in 0..3 {
            self.edges.insert((tri[i], tri[(i + 1) % 3]), id);
            self.incident[tri[i]] = id;
        }
        self.triangles.push(tri);
        self.alive.push(true);
        self.last = id;
        id
    }

    fn remove(&mut self, id: usize) {
        let tri = self.triangles[id];
        for i in 0..3 {
            let key = (tri[i], tri[(i + 1) % 3]);
            if self.edges.get(&key) == Some(&id) {
                self.edges.remove(&key);
            }
        }
        self.alive[id] = false;
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edges.contains_key(&(u, v)) || self.edges.contains_key(&(v, u))
    }

    /// The vertex of `tri` that is neither `x` nor `y`.
    fn apex(tri: [usize; 3], x: usize, y: usize) -> usize {
        tri.into_iter().find(|&v| v != x && v != y).unwrap_or(x)
    }

    fn orient(&self, a: usize, b: usize, c: usize) -> Ordering {
        orient2d(&self.coords[a], &self.coords[b], &self.coords[c])
    }

    fn sides(&self, id: usize, p: &ExactPoint2) -> [Ordering; 3] {
        let tri = self.triangles[id];
        [0, 1, 2].map(|i| orient2d(&self.coords[tri[i]], &self.coords[tri[(i + 1) % 3]], p))
    }

    /// Live triangle containing `p` (closed), with the side of `p` against
    /// each of its edges.
    fn locate(&self, p: &ExactPoint2) -> Option<(usize, [Ordering; 3])> {
        if self.alive[self.last] {
            let mut current = self.last;
            for _ in 0..self.triangles.len() {
                let sides = self.sides(current, p);
                let Some(i) = (0..3).find(|&i| sides[i] == Ordering::Less) else {
                    return Some((current, sides));
                };
                let tri = self.triangles[current];
                match self.edges.get(&(tri[(i + 1) % 3], tri[i])) {
                    Some(&next) => current = next,
                    None => break,
                }
            }
        }
        // without the Delaunay property a walk may cycle
        (0..self.triangles.len())
            .filter(|&id| self.alive[id])
            .map(|id| (id, self.sides(id, p)))
            .find(|(_, sides)| !sides.contains(&Ordering::Less))
    }

    fn insert_point(&mut self, v: usize, p: &ExactPoint2) {
        let Some((id, sides)) = self.locate(p) else {
            warn!(v, "point outside the enclosing triangle, skipped");
            self.complete = false;
            return;
        };

        let tri = self.triangles[id];
        let on_edges: Vec<usize> = (0..3).filter(|&i| sides[i] == Ordering::Equal).collect();
        match on_edges.as_slice() {
            [] => {
                self.remove(id);
                self.add([tri[0], tri[1], v]);
                self.add([tri[1], tri[2], v]);
                self.add([tri[2], tri[0], v]);
            },
            [i] => {
                let (x, y) = (tri[*i], tri[(*i + 1) % 3]);
                let a = tri[(*i + 2) % 3];
                let twin = self.edges.get(&(y, x)).copied();
                self.remove(id);
                self.add([x, v, a]);
                self.add([v, y, a]);
                if let Some(twin) = twin {
                    let b = Self::apex(self.triangles[twin], x, y);
                    self.remove(twin);
                    self.add([y, v, b]);
                    self.add([v, x, b]);
                }
            },
            // coincides with an existing vertex
            _ => {},
        }
    }

    fn crosses(&self, u: usize, v: usize, x: usize, y: usize) -> bool {
        let (a, b) = (self.orient(u, v, x), self.orient(u, v, y));
        let (c, d) = (self.orient(x, y, u), self.orient(x, y, v));
        a != Ordering::Equal && b != Ordering::Equal && a != b && c != Ordering::Equal && d != Ordering::Equal && c != d
    }

    /// Edges properly crossed by `uv`, in order from `u`, found by walking
    /// along the segment. `None` when the walk runs into a vertex on `uv`.
    fn crossed_edges(&self, u: usize, v: usize) -> Option<Vec<(usize, usize)>> {
        let start = self.incident[u];
        if !self.alive[start] {
            return None;
        }

        // the triangle around `u` whose corner opens towards `v`
        let mut current = start;
        let mut wedge = None;
        for _ in 0..self.triangles.len() {
            let tri = self.triangles[current];
            let k = tri.iter().position(|&w| w == u)?;
            let (w1, w2) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            if self.orient(u, w1, v) == Ordering::Greater && self.orient(u, w2, v) == Ordering::Less {
                wedge = Some((w2, w1));
                break;
            }
            current = *self.edges.get(&(u, w2))?;
            if current == start {
                break;
            }
        }

        let (mut left, mut right) = wedge?;
        let mut crossed = vec![(left, right)];
        for _ in 0..self.triangles.len() {
            let far = *self.edges.get(&(left, right))?;
            let b = Self::apex(self.triangles[far], left, right);
            if b == v {
                return Some(crossed);
            }
            match self.orient(u, v, b) {
                Ordering::Greater => left = b,
                Ordering::Less => right = b,
                Ordering::Equal => return None,
            }
            crossed.push((left, right));
        }
        None
    }

    /// Every live edge properly crossed by `uv`, in triangle order.
    fn crossing_scan(&self, u: usize, v: usize) -> Vec<(usize, usize)> {
        let mut listed = hashbrown::HashSet::new();
        let mut crossed = Vec::new();
        for tri in self.alive() {
            for i in 0..3 {
                let (x, y) = (tri[i], tri[(i + 1) % 3]);
                if self.crosses(u, v, x, y) && listed.insert((x.min(y), x.max(y))) {
                    crossed.push((x, y));
                }
            }
        }
        crossed
    }

    /// Make `uv` an edge of the triangulation by flipping the edges it crosses.
    fn insert_edge(&mut self, u: usize, v: usize) {
        if self.has_edge(u, v) {
            return;
        }

        let mut queue: VecDeque<(usize, usize)> = self
            .crossed_edges(u, v)
            .unwrap_or_else(|| self.crossing_scan(u, v))
            .into();

        let limit = 64 + 8 * queue.len() * queue.len();
        let mut steps = 0;
        while let Some((x, y)) = queue.pop_front() {
            steps += 1;
            if steps > limit {
                warn!(u, v, "constraint recovery did not converge");
                self.complete = false;
                return;
            }
            let (Some(&t1), Some(&t2)) = (self.edges.get(&(x, y)), self.edges.get(&(y, x))) else {
                warn!(x, y, "crossing edge lost its triangles");
                self.complete = false;
                continue;
            };
            let a = Self::apex(self.triangles[t1], x, y);
            let b = Self::apex(self.triangles[t2], x, y);
            let (ox, oy) = (self.orient(a, b, x), self.orient(a, b, y));
            let convex = ox != Ordering::Equal && oy != Ordering::Equal && ox != oy;
            if !convex {
                queue.push_back((x, y));
                continue;
            }

            // t1 = (x, y, a) and t2 = (y, x, b) become (x, b, a) and (b, y, a)
            self.remove(t1);
            self.remove(t2);
            self.add([x, b, a]);
            self.add([b, y, a]);
            if self.crosses(u, v, a, b) {
                queue.push_back((a, b));
            }
        }

        if !self.has_edge(u, v) {
            warn!(u, v, "constraint passes through a vertex, not recovered");
            self.complete = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64, z: i64) -> ExactPoint {
        ExactPoint::from_integers(x, y, z)
    }

    fn area_x2(pieces: &[Piece]) -> Exact {
        pieces.iter().fold(Exact::zero(), |acc, piece| {
            let [a, b, c] = piece.corners.clone().map(|q| q.project(2));
            acc + orient2d_value(&a, &b, &c)
        })
    }

    #[test]
    fn lone_face_passes_through_whole() {
        let face = [p(0, 0, 0), p(4, 0, 0), p(0, 4, 0)];
        let cluster = triangulate_cluster(&[face.clone()], &[]);
        assert!(cluster.complete);
        let pieces = cluster.pieces;
        assert_eq!(pieces.len(), 1);
        assert_eq!(area_x2(&pieces), int(16));
    }

    #[test]
    fn segment_splits_face_and_keeps_orientation() {
        // clockwise in xy, so every piece must stay clockwise too
        let face = [p(0, 0, 0), p(0, 4, 0), p(4, 0, 0)];
        let cut = Constraint::Segment(p(1, 1, 0), p(2, 1, 0));
        let cluster = triangulate_cluster(&[face], &[cut]);
        assert!(cluster.complete);
        let pieces = cluster.pieces;
        assert!(pieces.len() >= 5);
        assert_eq!(area_x2(&pieces), int(-16));
        let uses = |q: &ExactPoint| pieces.iter().any(|piece| piece.corners.contains(q));
        assert!(uses(&p(1, 1, 0)) && uses(&p(2, 1, 0)));
    }

    #[test]
    fn overlapping_faces_share_pieces() {
        let a = [p(0, 0, 0), p(4, 0, 0), p(0, 4, 0)];
        let b = [p(1, 1, 0), p(5, 1, 0), p(1, 5, 0)];
        let pieces = triangulate_cluster(&[a, b], &[]).pieces;
        let of = |face: usize| {
            let mut keys: Vec<Vec<ExactPoint>> = pieces
                .iter()
                .filter(|piece| piece.face == face)
                .map(|piece| {
                    let mut k = piece.corners.to_vec();
                    k.sort();
                    k
                })
                .collect();
            keys.sort();
            keys
        };
        let (first, second) = (of(0), of(1));
        let shared = first.iter().filter(|k| second.contains(k)).count();
        assert!(shared >= 1);
        assert_eq!(area_x2(&pieces.iter().filter(|x| x.face == 0).cloned().collect::<Vec<_>>()), int(16));
        assert_eq!(area_x2(&pieces.iter().filter(|x| x.face == 1).cloned().collect::<Vec<_>>()), int(16));
    }

    fn flat(x: i64, y: i64) -> ExactPoint2 {
        ExactPoint2::new(int(x), int(y))
    }

    /// A fan of crossing constraints over one face; recovering them needs flips.
    fn crossing_constraints() -> Vec<Constraint> {
        vec![
            Constraint::Segment(p(1, 1, 0), p(9, 2, 0)),
            Constraint::Segment(p(2, 7, 0), p(7, 1, 0)),
            Constraint::Segment(p(1, 5, 0), p(6, 5, 0)),
            Constraint::Segment(p(3, 1, 0), p(4, 7, 0)),
            Constraint::Point(p(5, 3, 0)),
        ]
    }

    #[test]
    fn repeated_runs_produce_identical_pieces() {
        let face = [p(0, 0, 0), p(12, 0, 0), p(0, 12, 0)];
        let constraints = crossing_constraints();
        let first = triangulate_cluster(&[face.clone()], &constraints);
        assert!(first.complete);
        assert_eq!(area_x2(&first.pieces), int(144));
        for _ in 0..8 {
            let again = triangulate_cluster(&[face.clone()], &constraints);
            assert_eq!(again.pieces.len(), first.pieces.len());
            for (x, y) in again.pieces.iter().zip(&first.pieces) {
                assert_eq!(x.face, y.face);
                assert_eq!(x.corners, y.corners);
            }
        }
    }

    #[test]
    fn crossed_constraints_become_edges() {
        let face = [p(0, 0, 0), p(12, 0, 0), p(0, 12, 0)];
        let pieces = triangulate_cluster(&[face], &crossing_constraints()).pieces;
        let proper = |a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2, d: &ExactPoint2| {
            let (o1, o2) = (orient2d(a, b, c), orient2d(a, b, d));
            let (o3, o4) = (orient2d(c, d, a), orient2d(c, d, b));
            o1 != Ordering::Equal && o2 != Ordering::Equal && o1 != o2 && o3 != Ordering::Equal && o4 != Ordering::Equal && o3 != o4
        };
        for constraint in crossing_constraints() {
            let Constraint::Segment(a, b) = constraint else {
                continue;
            };
            let (a, b) = (a.project(2), b.project(2));
            for piece in &pieces {
                let corners = piece.corners.clone().map(|q| q.project(2));
                for i in 0..3 {
                    assert!(!proper(&a, &b, &corners[i], &corners[(i + 1) % 3]));
                }
            }
        }
    }

    #[test]
    fn walking_location_finds_every_point() {
        let points: Vec<ExactPoint2> = (0..6).flat_map(|i| (0..6).map(move |j| flat(i * 3 + j % 2, j * 2))).collect();
        let mut mesh = Triangulation::enclosing(&points);
        for (id, q) in points.iter().enumerate() {
            mesh.insert_point(id + SUPER, q);
        }
        assert!(mesh.complete);
        // every inserted point is a corner of some live triangle
        for id in 0..points.len() {
            assert!(mesh.alive().any(|tri| tri.contains(&(id + SUPER))));
        }
        assert_eq!(mesh.alive().count(), 2 * points.len() + 1);
    }

    #[test]
    fn point_outside_the_enclosing_triangle_marks_it_incomplete() {
        let mut mesh = Triangulation::enclosing(&[flat(0, 0), flat(1, 0), flat(0, 1)]);
        mesh.coords.push(flat(1000, 1000));
        let v = mesh.coords.len() - 1;
        mesh.incident.push(0);
        mesh.insert_point(v, &flat(1000, 1000));
        assert!(!mesh.complete);
    }
}
