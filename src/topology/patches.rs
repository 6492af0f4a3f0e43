//! Manifold patches: faces connected through edges with exactly two sides.

use super::edges::UniqueEdgeMap;
use std::collections::VecDeque;

/// Patch label per face, numbered in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patches {
    pub labels: Vec<usize>,
    pub count: usize,
}

/// Flood faces across manifold edges, seeding in increasing face order.
/// Boundary and non-manifold edges separate patches.
pub fn extract_manifold_patches(face_count: usize, edges: &UniqueEdgeMap) -> Patches {
    const UNSET: usize = usize::MAX;
    let mut labels = vec![UNSET; face_count];
    let mut count = 0;
    let mut queue = VecDeque::new();

    for seed in 0..face_count {
        if labels[seed] != UNSET {
            continue;
        }
        labels[seed] = count;
        queue.push_back(seed);
        while let Some(f) = queue.pop_front() {
            for c in 0..3 {
                let e = edges.emap[3 * f + c];
                if !edges.is_manifold(e) {
                    continue;
                }
                for &he in &edges.incident[e] {
                    let g = UniqueEdgeMap::face_of(he);
                    if labels[g] == UNSET {
                        labels[g] = count;
                        queue.push_back(g);
                    }
                }
            }
        }
        count += 1;
    }

    Patches { labels, count }
}
