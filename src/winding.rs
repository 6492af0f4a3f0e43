//! Winding-number propagation over the cell adjacency graph.

use crate::topology::{CellDecomposition, Patches, UniqueEdgeMap};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// `num_faces x 2n` winding table, row-major. Column `2i` holds input `i`'s
/// winding number just above the face, column `2i + 1` just below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceWindings {
    pub inputs: usize,
    pub data: Vec<i32>,
}

impl FaceWindings {
    #[inline]
    pub const fn columns(&self) -> usize {
        2 * self.inputs
    }

    #[inline]
    pub fn rows(&self) -> usize {
        if self.inputs == 0 { 0 } else { self.data.len() / self.columns() }
    }

    #[inline]
    pub fn row(&self, face: usize) -> &[i32] {
        let n = self.columns();
        &self.data[face * n..(face + 1) * n]
    }

    #[inline]
    pub fn above(&self, face: usize, input: usize) -> i32 {
        self.row(face)[2 * input]
    }

    #[inline]
    pub fn below(&self, face: usize, input: usize) -> i32 {
        self.row(face)[2 * input + 1]
    }

    /// Winding numbers of every input above `face`.
    pub fn above_all(&self, face: usize) -> Vec<i32> {
        self.row(face).iter().step_by(2).copied().collect()
    }

    /// Winding numbers of every input below `face`.
    pub fn below_all(&self, face: usize) -> Vec<i32> {
        self.row(face).iter().skip(1).step_by(2).copied().collect()
    }
}

/// Output of [`propagate_winding_numbers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindingNumbers {
    pub faces: FaceWindings,
    /// Per-cell winding vector, one entry per input.
    pub cells: Vec<Vec<i32>>,
    /// `false` when the field is not piecewise constant (non-solid input).
    pub valid: bool,
}

/// Seed the unbounded cell with zeros and walk the cell graph. Crossing patch
/// `p` from its above cell to its below cell adds one to the winding number of
/// the input that owns `p`; going back subtracts one. `labels[f]` is the input
/// that face `f` came from.
pub fn propagate_winding_numbers(
    faces: &[[usize; 3]],
    edges: &UniqueEdgeMap,
    patches: &Patches,
    cells: &CellDecomposition,
    labels: &[usize],
    inputs: usize,
) -> WindingNumbers {
    let mut valid = cells.consistent;

    // a manifold edge traversed the same way by both faces cannot bound a solid
    for (e, incident) in edges.incident.iter().enumerate() {
        if let [h0, h1] = incident.as_slice() {
            if edges.is_forward(*h0) == edges.is_forward(*h1) {
                warn!(edge = e, "patch is not orientable");
                valid = false;
            }
        }
    }

    let mut patch_label: Vec<Option<usize>> = vec![None; patches.count];
    for (f, &p) in patches.labels.iter().enumerate() {
        match patch_label[p] {
            None => patch_label[p] = Some(labels[f]),
            Some(l) if l != labels[f] => {
                warn!(patch = p, "patch mixes faces of different inputs");
                valid = false;
            },
            Some(_) => {},
        }
    }

    // (neighbour, owning input, +1 when entering below)
    let mut adjacency: Vec<Vec<(usize, usize, i32)>> = vec![Vec::new(); cells.num_cells];
    for (p, &[above, below]) in cells.per_patch_cells.iter().enumerate() {
        let Some(label) = patch_label[p] else {
            continue;
        };
        adjacency[above].push((below, label, 1));
        adjacency[below].push((above, label, -1));
    }

    let mut windings: Vec<Option<Vec<i32>>> = vec![None; cells.num_cells];
    if let Some(outer) = cells.outer_cell {
        windings[outer] = Some(vec![0; inputs]);
        let mut queue = VecDeque::from([outer]);
        while let Some(cell) = queue.pop_front() {
            let current = windings[cell].clone().unwrap_or_else(|| vec![0; inputs]);
            for &(next, label, delta) in &adjacency[cell] {
                let mut expected = current.clone();
                expected[label] += delta;
                if let Some(seen) = &windings[next] {
                    if *seen != expected {
                        if valid {
                            warn!(cell = next, "winding numbers disagree across patches");
                        }
                        valid = false;
                    }
                    continue;
                }
                windings[next] = Some(expected);
                queue.push_back(next);
            }
        }
    }

    let cell_windings: Vec<Vec<i32>> = windings
        .into_iter()
        .map(|w| {
            w.unwrap_or_else(|| {
                valid = false;
                vec![0; inputs]
            })
        })
        .collect();

    let mut data = Vec::with_capacity(faces.len() * 2 * inputs);
    for &p in &patches.labels {
        let [above, below] = cells.per_patch_cells[p];
        for i in 0..inputs {
            data.push(cell_windings[above][i]);
            data.push(cell_windings[below][i]);
        }
    }
    debug!(cells = cells.num_cells, valid, "winding numbers propagated");

    WindingNumbers {
        faces: FaceWindings { inputs, data },
        cells: cell_windings,
        valid,
    }
}
