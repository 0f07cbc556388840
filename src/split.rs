//! Cutting a tree in two at an edge.
//!
//! The tree is consumed: its arena is turned into movable slots, the subtree
//! below the edge is moved into a new tree, and whatever is still reachable
//! from the old root is moved into a second one. Each node ends up in exactly
//! one result and the original handle no longer exists. Internal nodes left
//! with a single child by the cut are suppressed, and an unrooted result
//! has its basal bifurcation collapsed so that each of its edges stands for
//! a distinct bipartition.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::tree::{Edge, Tree};

/// Splits `tree` at `edge` into `(remaining, detached)`.
///
/// `detached` is rooted at the edge's head; `remaining` keeps the original
/// root. Both share the input's taxon namespace and come back with fresh
/// bipartitions.
///
/// # Errors
/// `TreeError::StaleEdge` if `edge` was not taken from this tree in its
/// current shape; `TreeError::EmptyTree` if the cut leaves no leaf on one side.
pub fn bipartition_by_edge(tree: Tree, edge: Edge) -> Result<(Tree, Tree)> {
    tree.check_edge(&edge)?;
    let leaves = tree.num_leaves();
    let (mut slots, root, namespace, rooted) = tree.into_slots();

    if let Some(tail) = slots[edge.tail].as_mut() {
        tail.detach_child(edge.head);
    }

    let mut detached = Tree::assemble(&mut slots, edge.head, Arc::clone(&namespace), rooted, |t| Ok(Some(t)))?;
    let mut remaining = Tree::assemble(&mut slots, root, namespace, rooted, |t| Ok(Some(t)))?;
    if !rooted {
        remaining.collapse_basal_bifurcation();
        detached.collapse_basal_bifurcation();
    }
    remaining.update_bipartitions()?;
    detached.update_bipartitions()?;

    debug!(
        leaves,
        remaining = remaining.num_leaves(),
        detached = detached.num_leaves(),
        "bipartitioned tree"
    );
    Ok((remaining, detached))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::{balanced_edges, centroid_edge};
    use crate::snapshot::TreeSnapshot;
    use crate::error::TreeError;
    use crate::io::{LoadOptions, tree_from_newick};
    use std::collections::{BTreeSet, HashSet};

    fn loaded(newick: &str) -> Tree {
        let mut tree = tree_from_newick(newick, &LoadOptions::default()).unwrap();
        tree.update_bipartitions().unwrap();
        tree
    }

    fn labels(tree: &Tree) -> BTreeSet<String> {
        tree.leaf_labels().unwrap().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_split_balanced_tree() {
        let tree = loaded("(((A,B),(C,D)),((E,F),(G,H)));");
        let all = labels(&tree);
        let edge = centroid_edge(&tree).unwrap();
        let (remaining, detached) = tree.split(edge).unwrap();

        assert_eq!(remaining.to_newick().unwrap(), "((E,F),G,H);");
        assert_eq!(detached.to_newick().unwrap(), "((A,B),C,D);");

        let (left, right) = (labels(&remaining), labels(&detached));
        assert!(left.is_disjoint(&right));
        assert_eq!(left.union(&right).cloned().collect::<BTreeSet<_>>(), all);
        assert!(Arc::ptr_eq(remaining.namespace(), detached.namespace()));
    }

    #[test]
    fn test_split_results_are_fresh_and_consistent() {
        let tree = loaded("(A,(B,(C,(D,(E,(F,(G,(H,I))))))));");
        let edge = centroid_edge(&tree).unwrap();
        let (remaining, detached) = tree.split(edge).unwrap();

        for piece in [&remaining, &detached] {
            let bips = piece.bipartitions().unwrap();
            assert_eq!(bips.tree_leafset().count_ones(), piece.num_leaves());
            assert_eq!(piece.leaves().len(), piece.num_leaves());
            // no unary node survives the cut
            for &id in bips.postorder() {
                assert!(piece[id].is_leaf() || piece[id].children().len() >= 2);
            }
        }
        assert_eq!(remaining.num_leaves() + detached.num_leaves(), 9);
    }

    #[test]
    fn test_split_results_have_no_basal_bifurcation() {
        let tree = loaded("(((A,B),(C,D)),((E,F),(G,H)),((I,J),(K,L)));");
        let edge = centroid_edge(&tree).unwrap();
        let (remaining, detached) = tree.split(edge).unwrap();
        assert_eq!(remaining.num_leaves(), 8);
        assert_eq!(detached.num_leaves(), 4);

        for piece in [&remaining, &detached] {
            let root = &piece[piece.root()];
            assert!(root.children().len() != 2 || root.children().iter().all(|&c| piece[c].is_leaf()));

            // every candidate edge is offered once per bipartition
            let bips = piece.bipartitions().unwrap();
            let candidates = balanced_edges(piece, 2).unwrap();
            let distinct: HashSet<_> = candidates
                .iter()
                .map(|e| TreeSnapshot::canonical(bips.leafset(e.head), bips.tree_leafset()))
                .collect();
            assert!(!candidates.is_empty());
            assert_eq!(distinct.len(), candidates.len());
        }
    }

    #[test]
    fn test_rooted_split_keeps_basal_bifurcation() {
        let mut tree = tree_from_newick("(((A,B),(C,D)),((E,F),(G,H)),(I,J));", &LoadOptions::default()).unwrap();
        tree.set_rooted(true);
        tree.update_bipartitions().unwrap();
        let edge = centroid_edge(&tree).unwrap();
        let (remaining, detached) = tree.split(edge).unwrap();

        assert_eq!(detached.to_newick().unwrap(), "((A,B),(C,D));");
        assert_eq!(remaining.to_newick().unwrap(), "(((E,F),(G,H)),(I,J));");
    }

    #[test]
    fn test_split_at_pendant_edge() {
        let tree = loaded("((A,B),(C,D));");
        let a = tree.leaves()[0];
        let edge = tree.edge(a).unwrap();
        let (remaining, detached) = tree.split(edge).unwrap();

        assert_eq!(detached.to_newick().unwrap(), "A;");
        assert_eq!(remaining.to_newick().unwrap(), "(B,C,D);");
    }

    #[test]
    fn test_split_with_foreign_edge_fails() {
        let donor = loaded("((A,B),(C,D));");
        let tree = loaded("((A,B),(C,D));");
        let edge = centroid_edge(&donor).unwrap();
        assert!(matches!(tree.split(edge), Err(TreeError::StaleEdge { .. })));
    }
}
