//! Directed half-edges and their undirected (unique) edges.

use hashbrown::HashMap;

/// **Mathematical Foundation: Half-Edge to Unique-Edge Map**
///
/// Corner `c` of face `f` owns half-edge `he = 3 * f + c`, the edge *opposite*
/// that corner, running from `F[f][(c + 1) % 3]` to `F[f][(c + 2) % 3]`.
/// Every undirected edge is numbered once, in order of first appearance.
///
/// - `directed[he]`: the half-edge as `(from, to)` (`E`)
/// - `unique[e]`: the undirected edge, smaller index first (`uE`)
/// - `emap[he]`: unique edge of each half-edge (`EMAP`)
/// - `incident[e]`: every half-edge on unique edge `e` (`uE2E`), ascending
#[derive(Debug, Clone, Default)]
pub struct UniqueEdgeMap {
    pub directed: Vec<(usize, usize)>,
    pub unique: Vec<(usize, usize)>,
    pub emap: Vec<usize>,
    pub incident: Vec<Vec<usize>>,
}

impl UniqueEdgeMap {
    pub fn new(faces: &[[usize; 3]]) -> Self {
        let mut map = Self {
            directed: Vec::with_capacity(faces.len() * 3),
            unique: Vec::new(),
            emap: Vec::with_capacity(faces.len() * 3),
            incident: Vec::new(),
        };
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::with_capacity(faces.len() * 3 / 2);

        for face in faces {
            for c in 0..3 {
                let he = map.directed.len();
                let (from, to) = (face[(c + 1) % 3], face[(c + 2) % 3]);
                let key = (from.min(to), from.max(to));
                let e = *lookup.entry(key).or_insert_with(|| {
                    map.unique.push(key);
                    map.incident.push(Vec::new());
                    map.unique.len() - 1
                });
                map.directed.push((from, to));
                map.emap.push(e);
                map.incident[e].push(he);
            }
        }
        map
    }

    #[inline]
    pub const fn face_of(he: usize) -> usize {
        he / 3
    }

    #[inline]
    pub const fn corner_of(he: usize) -> usize {
        he % 3
    }

    /// Exactly two incident half-edges.
    #[inline]
    pub fn is_manifold(&self, e: usize) -> bool {
        self.incident[e].len() == 2
    }

    /// Whether half-edge `he` runs along its unique edge (smaller index first).
    #[inline]
    pub fn is_forward(&self, he: usize) -> bool {
        self.directed[he].0 == self.unique[self.emap[he]].0
    }
}
