//! Union-find with path halving, shared by the coplanar clustering in the
//! resolver and the side merging in the cell extractor.

#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `true` when `a` and `b` were in different sets.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            },
        }
        true
    }

    /// Representative of every element, numbered `0..n` by first appearance.
    pub(crate) fn labels(&mut self) -> (Vec<usize>, usize) {
        let mut label_of_root = vec![usize::MAX; self.parent.len()];
        let mut labels = Vec::with_capacity(self.parent.len());
        let mut count = 0;
        for x in 0..self.parent.len() {
            let root = self.find(x);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = count;
                count += 1;
            }
            labels.push(label_of_root[root]);
        }
        (labels, count)
    }
}
