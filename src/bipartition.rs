//! Per-edge leaf bitsets, recomputed from the current tree shape.
//!
//! # Overview
//! Removing the edge above a node splits the leaves in two: those below the
//! node and all others. The bitset of the "below" side is stored per node, so
//! the bitset of a node is the leaf set of the edge it heads.
//!
//! # Algorithm
//! One postorder pass (children before parents):
//! - **Leaf node**: bitset with the leaf's taxon bit set
//! - **Internal node**: OR of the children's bitsets
//!
//! Leaf counts are accumulated alongside so selectors never need a popcount.

use crate::bitset::Bitset;
use crate::error::{Result, TreeError};
use crate::tree::{NodeId, Tree};

/// Leaf sets of every edge of one tree structure.
///
/// Only valid for the tree stamp it was computed at; [`Tree::bipartitions`]
/// refuses to hand out a stale instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Bipartitions {
    stamp: u64,
    masks: Vec<Bitset>,
    counts: Vec<usize>,
    postorder: Vec<NodeId>,
    root: NodeId,
}

impl Bipartitions {
    /// Stamp of the tree structure these leaf sets describe.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Leaves below `node`, i.e. the head side of the edge above it.
    ///
    /// # Panics
    /// If `node` is not a node of the tree these leaf sets were computed
    /// for. Use [`Bipartitions::get_leafset`] for ids of unknown origin.
    pub fn leafset(&self, node: NodeId) -> &Bitset {
        &self.masks[node]
    }

    /// Number of leaves below `node`.
    ///
    /// # Panics
    /// Same as [`Bipartitions::leafset`].
    pub fn leaf_count(&self, node: NodeId) -> usize {
        self.counts[node]
    }

    /// Checked [`Bipartitions::leafset`]: `None` if `node` is out of range.
    pub fn get_leafset(&self, node: NodeId) -> Option<&Bitset> {
        self.masks.get(node)
    }

    /// Checked [`Bipartitions::leaf_count`]: `None` if `node` is out of range.
    pub fn get_leaf_count(&self, node: NodeId) -> Option<usize> {
        self.counts.get(node).copied()
    }

    /// All leaves of the tree.
    pub fn tree_leafset(&self) -> &Bitset {
        &self.masks[self.root]
    }

    /// The node order the leaf sets were computed in. Skipping the root, this
    /// is the canonical edge enumeration order used for tie-breaking.
    pub fn postorder(&self) -> &[NodeId] {
        &self.postorder
    }
}

/// Recomputes the leaf bitset of every edge of `tree` from scratch.
///
/// # Errors
/// Returns `TreeError::UnknownTaxon` if a leaf's taxon has no index in the
/// tree's namespace.
pub fn refresh(tree: &Tree) -> Result<Bipartitions> {
    let namespace = tree.namespace();
    let words = namespace.words();
    let postorder = tree.postorder();
    let slots = tree.arena_len();

    // unreachable slots keep an empty, word-less bitset
    let mut masks = vec![Bitset(Vec::new()); slots];
    let mut counts = vec![0usize; slots];

    for &id in &postorder {
        let node = &tree[id];
        let mut mask = Bitset::zeros(words);
        if let Some(taxon) = node.taxon() {
            if taxon >= namespace.len() {
                return Err(TreeError::UnknownTaxon(taxon));
            }
            mask.set(taxon);
            counts[id] = 1;
        } else {
            for &child in node.children() {
                mask.or_assign(&masks[child]);
                counts[id] += counts[child];
            }
        }
        masks[id] = mask;
    }

    Ok(Bipartitions {
        stamp: tree.stamp(),
        masks,
        counts,
        postorder,
        root: tree.root(),
    })
}
