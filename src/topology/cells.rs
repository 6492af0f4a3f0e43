//! Cells: the connected regions of space the patches cut out.

use super::edges::UniqueEdgeMap;
use super::order::{face_key, order_facets_around_edge, sort_around_axis};
use super::patches::Patches;
use crate::config::BooleanConfig;
use crate::disjoint_set::DisjointSet;
use crate::exact::{Exact, ExactPoint, ExactVector, dot, int, orient3d, orient3d_value, sub};
use num_traits::Zero;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Which cell lies on each side of each patch.
///
/// Side `2p` of patch `p` is the side its face normals point to (above),
/// side `2p + 1` the other one (below).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellDecomposition {
    /// `[cell above, cell below]` per patch.
    pub per_patch_cells: Vec<[usize; 2]>,
    pub num_cells: usize,
    /// The unbounded cell; `None` only for an empty mesh.
    pub outer_cell: Option<usize>,
    /// `false` when some component could not be placed inside another.
    pub consistent: bool,
}

/// Side id of patch `p` that faces the normal (`above`) or not.
#[inline]
pub(crate) const fn side_of(patch: usize, above: bool) -> usize {
    if above { 2 * patch } else { 2 * patch + 1 }
}

/// Shared read-only view of the resolved mesh used by every query here.
pub(crate) struct Arrangement<'a> {
    pub vertices: &'a [ExactPoint],
    pub faces: &'a [[usize; 3]],
    pub patches: &'a Patches,
    pub edges: &'a UniqueEdgeMap,
    pub keys: Vec<i128>,
}

impl<'a> Arrangement<'a> {
    pub(crate) fn new(
        vertices: &'a [ExactPoint],
        faces: &'a [[usize; 3]],
        patches: &'a Patches,
        edges: &'a UniqueEdgeMap,
    ) -> Self {
        let keys = (0..faces.len())
            .map(|f| face_key(patches.labels[f], f, faces.len()))
            .collect();
        Self {
            vertices,
            faces,
            patches,
            edges,
            keys,
        }
    }

    fn corner(&self, f: usize, c: usize) -> &ExactPoint {
        &self.vertices[self.faces[f][c]]
    }

    /// Glue the sides of consecutive facets around every edge that is not a
    /// plain interior edge of a consistently oriented patch.
    fn merge_wedges(&self, sides: &mut DisjointSet) {
        for e in 0..self.edges.unique.len() {
            let incident = &self.edges.incident[e];
            if let [h0, h1] = incident.as_slice() {
                let same_patch = self.patches.labels[UniqueEdgeMap::face_of(*h0)]
                    == self.patches.labels[UniqueEdgeMap::face_of(*h1)];
                if same_patch && self.edges.is_forward(*h0) != self.edges.is_forward(*h1) {
                    continue;
                }
            }

            let order = order_facets_around_edge(self.vertices, self.faces, self.edges, &self.keys, e);
            for (i, &current) in order.iter().enumerate() {
                let next = order[(i + 1) % order.len()];
                let (pc, pn) = (
                    self.patches.labels[UniqueEdgeMap::face_of(current)],
                    self.patches.labels[UniqueEdgeMap::face_of(next)],
                );
                // the wedge lies counter-clockwise of `current` and clockwise of `next`
                let ccw_of_current = side_of(pc, self.edges.is_forward(current));
                let cw_of_next = side_of(pn, !self.edges.is_forward(next));
                sides.union(ccw_of_current, cw_of_next);
            }
        }
    }

    /// **Mathematical Foundation: Extreme Vertex Probe**
    ///
    /// The side of `faces` that touches the unbounded region. Take the
    /// lexicographically largest vertex `v`; the point `v + (1, 0, 0)` lies
    /// beyond every face. Among the edges at `v` pick the one closest in
    /// angle to `+x`. Sorting that edge's facets together with the probe puts
    /// the probe in exactly one wedge, and no face can separate it from the
    /// probe ray near `v`. The outer side is the counter-clockwise side of the
    /// facet preceding the probe.
    ///
    /// `faces` must be a union of edge-connected components.
    pub(crate) fn outer_side(&self, faces: &[usize]) -> Option<usize> {
        let v = faces
            .iter()
            .flat_map(|&f| self.faces[f].iter().copied())
            .max_by(|&a, &b| self.vertices[a].cmp(&self.vertices[b]))?;

        // (half-edge, direction) of the edge at `v` closest to +x
        let mut best: Option<(usize, ExactVector)> = None;
        for &f in faces {
            let face = self.faces[f];
            let Some(c) = face.iter().position(|&x| x == v) else {
                continue;
            };
            // the edge to face[c + 1] is opposite corner c + 2, and vice versa
            for (u, opposite) in [(face[(c + 1) % 3], (c + 2) % 3), (face[(c + 2) % 3], (c + 1) % 3)] {
                let d = sub(&self.vertices[u], &self.vertices[v]);
                if best.as_ref().is_none_or(|(_, current)| closer_to_x(&d, current)) {
                    best = Some((3 * f + opposite, d));
                }
            }
        }
        let (he, _) = best?;
        let e = self.edges.emap[he];
        let (lo, hi) = self.edges.unique[e];

        let probe = self.vertices[v].translated(&[int(1), Exact::zero(), Exact::zero()]);
        let incident = &self.edges.incident[e];
        let mut items: Vec<(&ExactPoint, i128)> = incident
            .iter()
            .map(|&he| {
                let f = UniqueEdgeMap::face_of(he);
                let tie = if self.edges.is_forward(he) { self.keys[f] } else { -self.keys[f] };
                (self.corner(f, UniqueEdgeMap::corner_of(he)), tie)
            })
            .collect();
        items.push((&probe, 0));

        let order = sort_around_axis(&self.vertices[lo], &self.vertices[hi], &items);
        let at = order.iter().position(|&i| i == incident.len())?;
        let before = incident[order[(at + order.len() - 1) % order.len()]];
        let patch = self.patches.labels[UniqueEdgeMap::face_of(before)];
        Some(side_of(patch, self.edges.is_forward(before)))
    }

    /// **Mathematical Foundation: Segment Probing**
    ///
    /// Which side of `faces` the point `q` sees. A segment from `q` to a point
    /// strictly inside one of the faces must cross the face set at least once;
    /// the first crossing (smallest `t` in `(0, 1]`) decides the side. Targets
    /// vary per attempt, and an attempt is abandoned when the first crossing
    /// touches an edge or vertex, or when the segment lies in a face plane.
    pub(crate) fn locate_point(&self, q: &ExactPoint, faces: &[usize], attempts: usize) -> Option<usize> {
        if faces.is_empty() {
            return None;
        }
        (0..attempts).find_map(|attempt| {
            let target = self.probe_target(faces, attempt);
            self.first_crossing(q, &target, faces)
        })
    }

    fn probe_target(&self, faces: &[usize], attempt: usize) -> ExactPoint {
        let f = faces[(attempt * 7919) % faces.len()];
        let weights = [1 + attempt % 3, 1 + (attempt / 3) % 5, 1 + (attempt / 15) % 7].map(|w| int(w as i64));
        let total = &weights[0] + &weights[1] + &weights[2];
        let mut coords = [Exact::zero(), Exact::zero(), Exact::zero()];
        for c in 0..3 {
            let p = self.corner(f, c);
            for (axis, coord) in coords.iter_mut().enumerate() {
                *coord += &weights[c] * p.coord(axis);
            }
        }
        let [x, y, z] = coords.map(|c| c / &total);
        ExactPoint::new(x, y, z)
    }

    fn first_crossing(&self, q: &ExactPoint, target: &ExactPoint, faces: &[usize]) -> Option<usize> {
        // (t, boundary, tie key, side)
        let mut best: Option<(Exact, bool, i128, usize)> = None;
        for &f in faces {
            let (a, b, c) = (self.corner(f, 0), self.corner(f, 1), self.corner(f, 2));
            let (from, to) = (orient3d(a, b, c, q), orient3d(a, b, c, target));
            if from.is_eq() {
                if to.is_eq() {
                    // the probe runs inside this face's plane
                    return None;
                }
                continue;
            }
            // the plane is hit at some t in (0, 1] only when the end is not on
            // the start's side
            if to == from {
                continue;
            }
            let signs = [
                orient3d(q, target, a, b),
                orient3d(q, target, b, c),
                orient3d(q, target, c, a),
            ];
            let boundary = if signs.iter().all(|&s| s == Ordering::Greater) || signs.iter().all(|&s| s == Ordering::Less) {
                false
            } else if !signs.contains(&Ordering::Greater) || !signs.contains(&Ordering::Less) {
                true
            } else {
                continue;
            };

            let (start, end) = (orient3d_value(a, b, c, q), orient3d_value(a, b, c, target));
            let t = &start / (&start - &end);
            let facing = from.reverse();
            let tie = if facing == Ordering::Less { -self.keys[f] } else { self.keys[f] };
            let patch = self.patches.labels[f];
            let side = side_of(patch, facing == Ordering::Less);
            let candidate = (t, boundary, tie, side);
            best = match best {
                None => Some(candidate),
                Some(current) => Some(earlier_hit(current, candidate)),
            };
        }
        match best {
            Some((_, false, _, side)) => Some(side),
            _ => None,
        }
    }
}

/// Keep the earlier of two hits. At equal `t` a boundary hit wins so the
/// attempt is rejected; otherwise the smaller tie key wins.
fn earlier_hit(a: (Exact, bool, i128, usize), b: (Exact, bool, i128, usize)) -> (Exact, bool, i128, usize) {
    match a.0.cmp(&b.0) {
        Ordering::Less => a,
        Ordering::Greater => b,
        Ordering::Equal => {
            if a.1 || b.1 {
                (a.0, true, a.2, a.3)
            } else if b.2 < a.2 {
                b
            } else {
                a
            }
        },
    }
}

/// `d` makes a smaller angle with `+x` than `current`. Both point away from
/// the maximal vertex, so neither has a positive x component.
fn closer_to_x(d: &ExactVector, current: &ExactVector) -> bool {
    match (d[0].is_zero(), current[0].is_zero()) {
        (true, current_zero) => !current_zero,
        (false, true) => false,
        (false, false) => &d[0] * &d[0] * dot(current, current) < &current[0] * &current[0] * dot(d, d),
    }
}

/// Group patches into cells.
///
/// Sides are first glued locally around every edge. Separate edge-connected
/// components are then nested: each one is probed against every other, and
/// its outer side joins the cell it was found in within its innermost
/// container, or the unbounded cell when nothing contains it.
pub fn extract_cells(
    vertices: &[ExactPoint],
    faces: &[[usize; 3]],
    patches: &Patches,
    edges: &UniqueEdgeMap,
    config: &BooleanConfig,
) -> CellDecomposition {
    if faces.is_empty() {
        return CellDecomposition {
            consistent: true,
            ..CellDecomposition::default()
        };
    }
    let arrangement = Arrangement::new(vertices, faces, patches, edges);
    let mut sides = DisjointSet::new(2 * patches.count);
    arrangement.merge_wedges(&mut sides);

    let components = connected_components(faces.len(), edges);
    let mut consistent = true;
    let outer: Vec<Option<usize>> = components.iter().map(|c| arrangement.outer_side(c)).collect();
    if outer.iter().any(Option::is_none) {
        warn!("component without an extreme edge");
        consistent = false;
    }

    // located[i][j]: side of component j that component i's probe point sees
    let count = components.len();
    let mut located: Vec<Vec<Option<usize>>> = vec![vec![None; count]; count];
    let mut contains = vec![vec![false; count]; count];
    for i in 0..count {
        let [a, b, c] = faces[components[i][0]].map(|v| vertices[v].clone());
        let three = int(3);
        let q = ExactPoint::new(
            (a.x() + b.x() + c.x()) / &three,
            (a.y() + b.y() + c.y()) / &three,
            (a.z() + b.z() + c.z()) / &three,
        );
        for j in (0..count).filter(|&j| j != i) {
            match arrangement.locate_point(&q, &components[j], config.max_probe_attempts) {
                Some(side) => {
                    located[i][j] = Some(side);
                    if let Some(outer_j) = outer[j] {
                        contains[j][i] = sides.find(side) != sides.find(outer_j);
                    }
                },
                None => {
                    warn!(component = i, container = j, "could not place component");
                    consistent = false;
                },
            }
        }
    }

    let depth: Vec<usize> = (0..count)
        .map(|i| (0..count).filter(|&j| contains[j][i]).count())
        .collect();
    let mut anchor: Option<usize> = None;
    for i in 0..count {
        let Some(outer_i) = outer[i] else {
            continue;
        };
        let innermost = (0..count)
            .filter(|&j| contains[j][i])
            .max_by_key(|&j| (depth[j], std::cmp::Reverse(j)));
        match innermost.and_then(|j| located[i][j]) {
            Some(side) => {
                sides.union(outer_i, side);
            },
            None => match anchor {
                Some(anchor) => {
                    sides.union(outer_i, anchor);
                },
                None => anchor = Some(outer_i),
            },
        }
    }

    let (labels, num_cells) = sides.labels();
    let per_patch_cells = (0..patches.count)
        .map(|p| [labels[side_of(p, true)], labels[side_of(p, false)]])
        .collect();
    let outer_cell = anchor.map(|side| labels[side]);
    debug!(components = count, cells = num_cells, consistent, "cells extracted");

    CellDecomposition {
        per_patch_cells,
        num_cells,
        outer_cell,
        consistent,
    }
}

/// Faces joined through any shared edge, manifold or not, in face order.
fn connected_components(face_count: usize, edges: &UniqueEdgeMap) -> Vec<Vec<usize>> {
    let mut faces = DisjointSet::new(face_count);
    for incident in &edges.incident {
        for pair in incident.windows(2) {
            faces.union(UniqueEdgeMap::face_of(pair[0]), UniqueEdgeMap::face_of(pair[1]));
        }
    }
    let (labels, count) = faces.labels();
    let mut components = vec![Vec::new(); count];
    for (f, &label) in labels.iter().enumerate() {
        components[label].push(f);
    }
    components
}
