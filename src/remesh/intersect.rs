//! Exact triangle/triangle contact.
//!
//! Two triangles either miss, meet in one point or segment on the line where
//! their planes cross, or lie in a common plane. Every contact is reduced to
//! a list of [`Constraint`]s per triangle, and constraints that only repeat
//! what the triangle already has (one of its corners, or one of its edges) are
//! dropped. A pair with nothing left is not intersecting.

use crate::exact::{
    Exact, ExactPoint, ExactPoint2, cross, dominant_axis, int, orient2d, orient2d_value, orient3d,
    orient3d_value, triangle_normal,
};
use num_traits::Zero;
use std::cmp::Ordering;

/// Geometry a triangle has to be re-triangulated around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Constraint {
    Point(ExactPoint),
    Segment(ExactPoint, ExactPoint),
}

impl Constraint {
    fn between(lo: ExactPoint, hi: ExactPoint) -> Self {
        if lo == hi {
            Constraint::Point(lo)
        } else {
            Constraint::Segment(lo, hi)
        }
    }

    /// A corner, or a segment joining two corners (an edge).
    pub(crate) fn is_trivial(&self, corners: &[ExactPoint; 3]) -> bool {
        match self {
            Constraint::Point(p) => corners.contains(p),
            Constraint::Segment(p, q) => corners.contains(p) && corners.contains(q),
        }
    }
}

/// The non-trivial part of a contact between triangles `first` and `second`.
#[derive(Debug, Clone)]
pub(crate) struct Contact {
    pub coplanar: bool,
    pub on_first: Vec<Constraint>,
    pub on_second: Vec<Constraint>,
}

/// Closed axis-aligned box in exact coordinates.
#[derive(Debug, Clone)]
pub(crate) struct ExactBox {
    pub min: [Exact; 3],
    pub max: [Exact; 3],
}

impl ExactBox {
    pub(crate) fn of_triangle(tri: &[ExactPoint; 3]) -> Self {
        let pick = |axis: usize, max: bool| {
            let coords = tri.iter().map(|p| p.coord(axis));
            let best = if max { coords.max() } else { coords.min() };
            best.cloned().unwrap_or_else(Exact::zero)
        };
        Self {
            min: [pick(0, false), pick(1, false), pick(2, false)],
            max: [pick(0, true), pick(1, true), pick(2, true)],
        }
    }

    pub(crate) fn overlaps(&self, other: &ExactBox) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }
}

/// Intersect two non-degenerate triangles. `None` when they are disjoint or
/// only share corners/edges.
pub(crate) fn intersect_triangles(a: &[ExactPoint; 3], b: &[ExactPoint; 3]) -> Option<Contact> {
    let side_b = sides_of(b, a);
    if strictly_one_side(&side_b) {
        return None;
    }
    let na = triangle_normal(&a[0], &a[1], &a[2]);
    if side_b.iter().all(|side| side.is_eq()) {
        return coplanar_contact(a, b, dominant_axis(&na));
    }

    let side_a = sides_of(a, b);
    if strictly_one_side(&side_a) {
        return None;
    }

    // both sections lie on the line where the planes meet
    let nb = triangle_normal(&b[0], &b[1], &b[2]);
    let axis = dominant_axis(&cross(&na, &nb));
    let (a_lo, a_hi) = span_along(plane_section(a, &side_a, b), axis)?;
    let (b_lo, b_hi) = span_along(plane_section(b, &side_b, a), axis)?;
    let lo = if a_lo.coord(axis) >= b_lo.coord(axis) { a_lo } else { b_lo };
    let hi = if a_hi.coord(axis) <= b_hi.coord(axis) { a_hi } else { b_hi };
    if lo.coord(axis) > hi.coord(axis) {
        return None;
    }

    let shared = Constraint::between(lo, hi);
    let on_first = keep_non_trivial(vec![shared.clone()], a);
    let on_second = keep_non_trivial(vec![shared], b);
    finish(false, on_first, on_second)
}

fn finish(coplanar: bool, on_first: Vec<Constraint>, on_second: Vec<Constraint>) -> Option<Contact> {
    if on_first.is_empty() && on_second.is_empty() {
        None
    } else {
        Some(Contact {
            coplanar,
            on_first,
            on_second,
        })
    }
}

fn keep_non_trivial(mut constraints: Vec<Constraint>, corners: &[ExactPoint; 3]) -> Vec<Constraint> {
    constraints.retain(|c| !c.is_trivial(corners));
    let mut unique: Vec<Constraint> = Vec::with_capacity(constraints.len());
    for c in constraints {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique
}

/// Side of the plane of `plane` each corner of `tri` lies on.
fn sides_of(tri: &[ExactPoint; 3], plane: &[ExactPoint; 3]) -> [Ordering; 3] {
    tri.each_ref().map(|p| orient3d(&plane[0], &plane[1], &plane[2], p))
}

fn strictly_one_side(side: &[Ordering; 3]) -> bool {
    side.iter().all(|s| s.is_gt()) || side.iter().all(|s| s.is_lt())
}

/// Points of `tri` on the plane of `plane`, given the sides of its corners.
/// At most two points when the triangle is not contained in the plane.
fn plane_section(tri: &[ExactPoint; 3], side: &[Ordering; 3], plane: &[ExactPoint; 3]) -> Vec<ExactPoint> {
    let distance = |p: &ExactPoint| orient3d_value(&plane[0], &plane[1], &plane[2], p);
    let mut points = Vec::with_capacity(2);
    for i in 0..3 {
        let j = (i + 1) % 3;
        if side[i].is_eq() {
            points.push(tri[i].clone());
        } else if side[j] == side[i].reverse() {
            let (di, dj) = (distance(&tri[i]), distance(&tri[j]));
            let t = &di / (&di - &dj);
            points.push(tri[i].lerp(&tri[j], &t));
        }
    }
    points
}

fn span_along(mut points: Vec<ExactPoint>, axis: usize) -> Option<(ExactPoint, ExactPoint)> {
    points.sort_by(|p, q| p.coord(axis).cmp(q.coord(axis)));
    let lo = points.first()?.clone();
    let hi = points.pop()?;
    Some((lo, hi))
}

fn coplanar_contact(a: &[ExactPoint; 3], b: &[ExactPoint; 3], axis: usize) -> Option<Contact> {
    let clip_edges = |from: &[ExactPoint; 3], into: &[ExactPoint; 3]| {
        (0..3)
            .filter_map(|i| clip_segment(&from[i], &from[(i + 1) % 3], into, axis))
            .collect::<Vec<_>>()
    };
    let on_first = keep_non_trivial(clip_edges(b, a), a);
    let on_second = keep_non_trivial(clip_edges(a, b), b);
    finish(true, on_first, on_second)
}

/// Part of segment `pq` inside the closed triangle `tri`, all in one plane.
/// Works on the projection that drops `axis`; every edge test is affine in the
/// segment parameter, so the clip is an interval of `t`.
pub(crate) fn clip_segment(
    p: &ExactPoint,
    q: &ExactPoint,
    tri: &[ExactPoint; 3],
    axis: usize,
) -> Option<Constraint> {
    let corners = tri.clone().map(|c| c.project(axis));
    let flip = orient2d(&corners[0], &corners[1], &corners[2]).is_lt();
    let (p2, q2) = (p.project(axis), q.project(axis));

    let mut t_lo = Exact::zero();
    let mut t_hi = int(1);
    for i in 0..3 {
        let (c0, c1) = (&corners[i], &corners[(i + 1) % 3]);
        let outside = |r: &ExactPoint2| {
            let side = orient2d(c0, c1, r);
            if flip { side.is_gt() } else { side.is_lt() }
        };
        match (outside(&p2), outside(&q2)) {
            (true, true) => return None,
            (false, false) => {},
            (entering, _) => {
                let hp = orient2d_value(c0, c1, &p2);
                let t = &hp / (&hp - orient2d_value(c0, c1, &q2));
                if entering {
                    if t > t_lo {
                        t_lo = t;
                    }
                } else if t < t_hi {
                    t_hi = t;
                }
            },
        }
    }

    if t_lo > t_hi {
        return None;
    }
    let lo = p.lerp(q, &t_lo);
    let hi = p.lerp(q, &t_hi);
    Some(Constraint::between(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64, z: i64) -> ExactPoint {
        ExactPoint::from_integers(x, y, z)
    }

    #[test]
    fn crossing_triangles_share_one_segment() {
        let a = [p(0, 0, 0), p(4, 0, 0), p(0, 4, 0)];
        let b = [p(1, 1, -1), p(1, 1, 1), p(-3, 1, 0)];
        let contact = intersect_triangles(&a, &b).unwrap();
        assert!(!contact.coplanar);
        // the edge x = 0 of `a` cuts the section of `b` short
        let shared = Constraint::Segment(p(0, 1, 0), p(1, 1, 0));
        assert_eq!(contact.on_first, vec![shared.clone()]);
        assert_eq!(contact.on_second, vec![shared]);
    }

    #[test]
    fn clip_keeps_rational_crossings() {
        let tri = [p(0, 0, 0), p(3, 0, 0), p(0, 3, 0)];
        let clipped = clip_segment(&p(-1, 1, 0), &p(1, 1, 0), &tri, 2).unwrap();
        assert_eq!(clipped, Constraint::Segment(p(0, 1, 0), p(1, 1, 0)));
        let half = ExactPoint::new(int(1) / int(2), int(0), int(0));
        let touch = clip_segment(&half, &p(1, -1, 0), &tri, 2).unwrap();
        assert_eq!(touch, Constraint::Point(half));
    }

    #[test]
    fn shared_edge_is_not_an_intersection() {
        let a = [p(0, 0, 0), p(1, 0, 0), p(0, 1, 0)];
        let b = [p(1, 0, 0), p(0, 0, 0), p(0, 0, 1)];
        assert!(intersect_triangles(&a, &b).is_none());
        let flat = [p(1, 0, 0), p(0, 0, 0), p(0, -1, 0)];
        assert!(intersect_triangles(&a, &flat).is_none());
    }

    #[test]
    fn coplanar_overlap_clips_edges() {
        let a = [p(0, 0, 0), p(4, 0, 0), p(0, 4, 0)];
        let b = [p(1, 1, 0), p(8, 1, 0), p(1, 8, 0)];
        let contact = intersect_triangles(&a, &b).unwrap();
        assert!(contact.coplanar);
        assert!(contact.on_first.contains(&Constraint::Segment(p(1, 1, 0), p(3, 1, 0))));
        assert!(!contact.on_second.is_empty());
    }

    #[test]
    fn touching_corner_constrains_only_the_touched_face() {
        let a = [p(0, 0, 0), p(4, 0, 0), p(0, 4, 0)];
        let b = [p(1, 1, 0), p(1, 1, 5), p(2, 3, 5)];
        let contact = intersect_triangles(&a, &b).unwrap();
        assert_eq!(contact.on_first, vec![Constraint::Point(p(1, 1, 0))]);
        assert!(contact.on_second.is_empty());
    }
}
