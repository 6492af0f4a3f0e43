//! Cyclic order of facets around an edge.

use super::edges::UniqueEdgeMap;
use crate::exact::{ExactPoint, dot, orient3d, sub};
use num_traits::Signed;
use std::cmp::Ordering;

/// **Mathematical Foundation: Radial Sort Around an Axis**
///
/// Facets sharing the edge `s -> d` are fans around that axis, each identified
/// by its opposite vertex. Angles are measured right-handedly about `d - s`
/// starting at the first item. The circle is cut into two half-turns: `[0, pi)`
/// where `orient3d(s, d, ref, p) > 0` (plus the reference direction itself) and
/// `[pi, 2 pi)`. Inside a half-turn `a` precedes `b` iff
/// `orient3d(s, d, a, b) > 0`.
///
/// Facets at exactly the same angle are ordered by `tie`, which stands for a
/// symbolic rotation of that size: a facet whose normal points counter-clockwise
/// carries `+key`, one whose normal points clockwise carries `-key`, and a
/// larger key means an infinitely larger displacement. The same keys break
/// ties in ray probing, so both see one consistently perturbed arrangement.
pub(crate) fn sort_around_axis(s: &ExactPoint, d: &ExactPoint, items: &[(&ExactPoint, i128)]) -> Vec<usize> {
    let Some(&(reference, _)) = items.first() else {
        return Vec::new();
    };
    let axis = sub(d, s);
    let axis_len = dot(&axis, &axis);
    let u = sub(reference, s);
    let u_along = dot(&u, &axis);

    let half: Vec<u8> = items
        .iter()
        .map(|&(p, _)| match orient3d(s, d, reference, p) {
            Ordering::Greater => 0,
            Ordering::Less => 1,
            Ordering::Equal => {
                // same direction as the reference once projected off the axis
                let w = sub(p, s);
                let same = dot(&u, &w) * &axis_len - &u_along * dot(&w, &axis);
                if same.is_positive() { 0 } else { 1 }
            },
        })
        .collect();

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&i, &j| {
        half[i].cmp(&half[j]).then_with(|| {
            match orient3d(s, d, items[i].0, items[j].0) {
                Ordering::Greater => Ordering::Less,
                Ordering::Less => Ordering::Greater,
                Ordering::Equal => items[i].1.cmp(&items[j].1),
            }
        })
    });
    order
}

/// Perturbation key of face `f`: patch-major, always positive.
#[inline]
pub(crate) fn face_key(patch: usize, face: usize, face_count: usize) -> i128 {
    patch as i128 * face_count as i128 + face as i128 + 1
}

/// Half-edges on unique edge `e`, in counter-clockwise order about
/// `unique[e].0 -> unique[e].1`.
pub(crate) fn order_facets_around_edge(
    vertices: &[ExactPoint],
    faces: &[[usize; 3]],
    edges: &UniqueEdgeMap,
    keys: &[i128],
    e: usize,
) -> Vec<usize> {
    let (s, d) = edges.unique[e];
    let incident = &edges.incident[e];
    let items: Vec<(&ExactPoint, i128)> = incident
        .iter()
        .map(|&he| {
            let f = UniqueEdgeMap::face_of(he);
            let opposite = &vertices[faces[f][UniqueEdgeMap::corner_of(he)]];
            let tie = if edges.is_forward(he) { keys[f] } else { -keys[f] };
            (opposite, tie)
        })
        .collect();
    sort_around_axis(&vertices[s], &vertices[d], &items)
        .into_iter()
        .map(|i| incident[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64, z: i64) -> ExactPoint {
        ExactPoint::from_integers(x, y, z)
    }

    #[test]
    fn fins_sort_counter_clockwise() {
        // axis along +z, fins at 0, 90, 180 and 270 degrees listed out of order
        let (s, d) = (p(0, 0, 0), p(0, 0, 1));
        let (east, north, west, south) = (p(1, 0, 0), p(0, 1, 0), p(-1, 0, 0), p(0, -1, 0));
        let items = [(&east, 1), (&west, 2), (&south, 3), (&north, 4)];
        assert_eq!(sort_around_axis(&s, &d, &items), vec![0, 3, 1, 2]);
    }

    #[test]
    fn coincident_fins_follow_tie_keys() {
        let (s, d) = (p(0, 0, 0), p(0, 0, 1));
        let (east, far_east, north) = (p(1, 0, 0), p(5, 0, 3), p(0, 2, 0));
        let items = [(&east, 7), (&north, 1), (&far_east, -2)];
        assert_eq!(sort_around_axis(&s, &d, &items), vec![2, 0, 1]);
    }

    #[test]
    fn keys_are_distinct_and_positive() {
        assert_eq!(face_key(0, 0, 10), 1);
        assert!(face_key(1, 0, 10) > face_key(0, 9, 10));
    }
}
