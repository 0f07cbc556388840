//! Extract canonical split snapshots from trees.
//!
//! # Overview
//! A TreeSnapshot captures all non-trivial bipartitions (splits) of a tree.
//! This immutable snapshot can be safely compared with other snapshots in
//! parallel.
//!
//! # What is a split?
//! Each internal edge divides the leaves into two groups:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← this edge creates the split {A,B} | {C,D}
//! ```
//!
//! Only one side of each split is stored, see [`TreeSnapshot::canonical`].
//! Snapshots are only comparable between trees indexing their leaves in the
//! same namespace, which is why comparisons first restrict both trees to one
//! shared namespace.

use std::collections::HashSet;

use crate::bitset::Bitset;
use crate::error::Result;
use crate::tree::Tree;

/// An immutable snapshot of all non-trivial splits of a tree.
///
/// # Fields
/// - `parts`: All non-trivial splits, **canonicalized**
/// - `internal_edges`: Number of internal edges, root excluded
/// - `num_leaves`: Total number of leaves
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub parts: HashSet<Bitset>,
    pub internal_edges: usize,
    pub num_leaves: usize,
}

impl TreeSnapshot {
    /// Extract a snapshot from a tree with fresh bipartitions.
    ///
    /// # Algorithm
    /// 1. Walk the edges in postorder, skipping the root
    /// 2. Keep the edges whose head is internal and which leave at least two
    ///    leaves on both sides (the others do not split anything)
    /// 3. Canonicalize each kept leaf set
    ///
    /// # Errors
    /// Returns `TreeError::StaleBipartitions` if the tree changed since its
    /// last refresh.
    pub fn from_tree(tree: &Tree) -> Result<Self> {
        let bips = tree.bipartitions()?;
        let all = bips.tree_leafset();
        let num_leaves = tree.num_leaves();

        let mut parts = HashSet::new();
        let mut internal_edges = 0;
        for &id in bips.postorder() {
            let node = &tree[id];
            if node.parent().is_none() || node.is_leaf() {
                continue;
            }
            internal_edges += 1;

            let below = bips.leaf_count(id);
            if below < 2 || num_leaves - below < 2 {
                continue;
            }
            parts.insert(Self::canonical(bips.leafset(id), all));
        }

        Ok(TreeSnapshot { parts, internal_edges, num_leaves })
    }

    /// Canonicalize a leaf set to one representation per split.
    ///
    /// # Problem
    /// A split {A,B}|{C,D} can show up as either side depending on where the
    /// tree is rooted:
    ///
    /// ```text
    ///        (root)              node1
    ///        /   \               /   \
    ///    node1    node2      (root)   B
    ///    /   \    /   \      /   \
    ///   A     B  C     D    node2  A
    ///                       /   \
    ///                      C     D
    /// ```
    /// The first stores {A,B} above node1, the second {C,D} above node2.
    ///
    /// # Solution
    /// Always store the side that does NOT contain the tree's lowest leaf
    /// index. Complements are taken relative to the tree's own leaf set, so
    /// trees covering only part of their namespace are handled too.
    ///
    /// # Example
    /// Leaves: A=0, B=1, C=2, D=3
    /// - {A,B}: `0b0011` contains leaf 0 → flip to {C,D}: `0b1100`
    /// - {C,D}: `0b1100` no leaf 0 → keep `0b1100`
    pub fn canonical(side: &Bitset, all: &Bitset) -> Bitset {
        match all.first_one() {
            Some(anchor) if side.contains(anchor) => all.difference(side),
            _ => side.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LoadOptions, trees_from_newick};

    #[test]
    fn test_canonicalization() {
        let mut all = Bitset::zeros(1);
        (0..4).for_each(|i| all.set(i));

        let mut part_ab = Bitset::zeros(1);
        part_ab.set(0);
        part_ab.set(1);

        let mut part_cd = Bitset::zeros(1);
        part_cd.set(2);
        part_cd.set(3);

        assert_eq!(TreeSnapshot::canonical(&part_ab, &all).0[0], 0b1100);
        assert_eq!(TreeSnapshot::canonical(&part_cd, &all).0[0], 0b1100);
    }

    /// The anchor is the lowest leaf present in the tree, not namespace index 0.
    #[test]
    fn test_canonicalization_on_partial_leaf_set() {
        let mut all = Bitset::zeros(1);
        (2..6).for_each(|i| all.set(i));

        let mut low = Bitset::zeros(1);
        low.set(2);
        low.set(3);

        assert_eq!(TreeSnapshot::canonical(&low, &all).0[0], 0b110000);
    }

    /// Asymmetric tree, leaves A=0 .. E=4
    ///
    /// ```text
    ///              root
    ///             /    \
    ///         node1     E
    ///         /   \
    ///     node2    D
    ///     /   \
    ///    A    node3
    ///         /   \
    ///        B     C
    /// ```
    ///
    /// Loaded unrooted, node1 dissolves into the root. Remaining splits:
    ///
    /// | Partition | Raw       | Has A? | Canonical |
    /// |-----------|-----------|--------|-----------|
    /// | node3     | 0b00110   | NO     | 0b00110   |
    /// | node2     | 0b00111   | YES    | 0b11000   |
    #[test]
    fn test_snapshot_of_asymmetric_tree() {
        let mut trees = trees_from_newick(&["(((A,(B,C)),D),E);"], &LoadOptions::default()).unwrap();
        let tree = &mut trees[0];
        tree.update_bipartitions().unwrap();

        let snap = TreeSnapshot::from_tree(tree).unwrap();
        let mut parts: Vec<u64> = snap.parts.iter().map(|b| b.0[0]).collect();
        parts.sort_unstable();

        assert_eq!(parts, vec![0b00110, 0b11000]);
        assert_eq!(snap.internal_edges, 2);
        assert_eq!(snap.num_leaves, 5);
    }

    /// Rooting the same unrooted topology differently yields the same snapshot.
    #[test]
    fn test_snapshot_ignores_rooting() {
        let mut trees = trees_from_newick(
            &["((A,B),(C,(D,E)));", "(((A,B),C),(D,E));", "(A,(C,(B,(D,E))));"],
            &LoadOptions::default(),
        )
        .unwrap();
        let snaps: Vec<TreeSnapshot> = trees
            .iter_mut()
            .map(|t| {
                t.update_bipartitions().unwrap();
                TreeSnapshot::from_tree(t).unwrap()
            })
            .collect();

        assert_eq!(snaps[0].parts, snaps[1].parts);
        assert_ne!(snaps[0].parts, snaps[2].parts);
    }
}
