//! Cancelling and merging faces that sit on the same three vertices.

use crate::errors::{BooleanError, BooleanResult};
use hashbrown::HashMap;
use tracing::error;

/// Output of [`resolve_duplicated_faces`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduplicated {
    pub faces: Vec<[usize; 3]>,
    /// `source[k]` is the input index of output face `k`.
    pub source: Vec<usize>,
}

/// `true` for the orientation whose rotation starting at the smallest index
/// is increasing.
fn is_positive(face: &[usize; 3]) -> bool {
    let start = (0..3).min_by_key(|&c| face[c]).unwrap_or(0);
    face[(start + 1) % 3] < face[(start + 2) % 3]
}

/// **Mathematical Foundation: Net Face Multiplicity**
///
/// Faces on the same vertex triple are counted by orientation. Opposite
/// copies cancel pairwise, so the group contributes `positive - negative`
/// oriented copies to the boundary:
/// - `0`: every copy is dropped
/// - `+1` / `-1`: the first face with the majority orientation is kept
/// - anything else cannot be the boundary of a region and is an
///   [`BooleanError::InconsistentDuplicateFaces`] error, whatever operation
///   selected the faces
///
/// Groups keep the order of their first face.
pub fn resolve_duplicated_faces(faces: &[[usize; 3]]) -> BooleanResult<Deduplicated> {
    let mut group_of: HashMap<[usize; 3], usize> = HashMap::with_capacity(faces.len());
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (f, face) in faces.iter().enumerate() {
        let mut key = *face;
        key.sort_unstable();
        let g = *group_of.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(f);
    }

    let mut out = Deduplicated {
        faces: Vec::with_capacity(groups.len()),
        source: Vec::with_capacity(groups.len()),
    };
    for members in &groups {
        let positive = members.iter().filter(|&&f| is_positive(&faces[f])).count();
        let negative = members.len() - positive;
        if positive == negative {
            continue;
        }
        if positive.abs_diff(negative) > 1 {
            let mut vertices = faces[members[0]];
            vertices.sort_unstable();
            error!(?vertices, positive, negative, "face multiplicity above one");
            return Err(BooleanError::InconsistentDuplicateFaces {
                vertices,
                positive,
                negative,
            });
        }
        let majority = positive > negative;
        if let Some(&keep) = members.iter().find(|&&f| is_positive(&faces[f]) == majority) {
            out.faces.push(faces[keep]);
            out.source.push(keep);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_pair_cancels() {
        let faces = [[0, 1, 2], [2, 1, 0], [3, 4, 5]];
        let out = resolve_duplicated_faces(&faces).unwrap();
        assert_eq!(out.faces, vec![[3, 4, 5]]);
        assert_eq!(out.source, vec![2]);
    }

    #[test]
    fn rotations_are_the_same_face() {
        let faces = [[1, 2, 0], [0, 1, 2], [0, 2, 1]];
        let out = resolve_duplicated_faces(&faces).unwrap();
        assert_eq!(out.faces, vec![[1, 2, 0]]);
        assert_eq!(out.source, vec![0]);
    }

    #[test]
    fn double_cover_is_an_error() {
        let faces = [[0, 1, 2], [1, 2, 0]];
        assert_eq!(
            resolve_duplicated_faces(&faces),
            Err(BooleanError::InconsistentDuplicateFaces {
                vertices: [0, 1, 2],
                positive: 2,
                negative: 0
            })
        );
        // one cancelling pair does not rescue the other two copies
        let faces = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];
        assert!(matches!(
            resolve_duplicated_faces(&faces),
            Err(BooleanError::InconsistentDuplicateFaces {
                positive: 3,
                negative: 1,
                ..
            })
        ));
    }
}
