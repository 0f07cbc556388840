//! Centroid edge selection.
//!
//! Two rules, both reading fresh bipartitions of the tree:
//!
//! 1. **Deterministic**: the edge whose head side holds closest to half of
//!    the leaves. Every edge with a tail is a candidate, pendant edges
//!    included; candidates are visited in postorder (children in stored
//!    order) and the first one reaching the smallest imbalance wins.
//!
//! 2. **Randomized**: a uniformly random internal edge among those leaving at
//!    least `min_leaves` leaves on both sides. The random source is passed in
//!    by the caller so runs are reproducible with a seeded RNG.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{Result, TreeError};
use crate::tree::{Edge, Tree};

/// Which rule picks the edge to cut.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CentroidMode {
    #[default]
    Deterministic,
    Randomized,
}

/// Returns the edge splitting the leaf set as evenly as possible.
///
/// The imbalance of an edge with `k` leaves below it in a tree of `n` leaves
/// is `|n/2 - k|`; it is compared as `|n - 2k|` to stay in integers.
///
/// # Errors
/// - `TreeError::TooFewLeaves` if the tree has fewer than 2 leaves
/// - `TreeError::StaleBipartitions` if the tree changed since the last refresh
pub fn centroid_edge(tree: &Tree) -> Result<Edge> {
    let bips = tree.bipartitions()?;
    let num_leaves = bips.leaf_count(tree.root());
    if num_leaves < 2 {
        return Err(TreeError::TooFewLeaves { leaves: num_leaves });
    }

    let mut best: Option<(usize, usize)> = None;
    for &head in bips.postorder() {
        if tree[head].parent().is_none() {
            continue;
        }
        let imbalance = num_leaves.abs_diff(2 * bips.leaf_count(head));
        if best.is_none_or(|(lowest, _)| imbalance < lowest) {
            best = Some((imbalance, head));
        }
    }

    let (imbalance, head) = best.ok_or(TreeError::TooFewLeaves { leaves: num_leaves })?;
    debug!(head, imbalance, num_leaves, "centroid edge");
    tree.edge(head)
}

/// Every internal edge with at least `min_leaves` leaves on each side, in
/// postorder.
pub fn balanced_edges(tree: &Tree, min_leaves: usize) -> Result<Vec<Edge>> {
    let bips = tree.bipartitions()?;
    let num_leaves = bips.leaf_count(tree.root());

    bips.postorder()
        .iter()
        .copied()
        .filter(|&head| {
            let node = &tree[head];
            let below = bips.leaf_count(head);
            node.parent().is_some()
                && !node.is_leaf()
                && below >= min_leaves
                && num_leaves - below >= min_leaves
        })
        .map(|head| tree.edge(head))
        .collect()
}

/// Returns a random internal edge with at least `min_leaves` leaves on each
/// side.
///
/// # Errors
/// - `TreeError::NoEligibleEdge` if no internal edge satisfies the bound
/// - `TreeError::StaleBipartitions` if the tree changed since the last refresh
pub fn random_centroid_edge<R: Rng + ?Sized>(tree: &Tree, min_leaves: usize, rng: &mut R) -> Result<Edge> {
    let candidates = balanced_edges(tree, min_leaves)?;
    let edge = candidates
        .choose(rng)
        .copied()
        .ok_or(TreeError::NoEligibleEdge { min_leaves })?;
    debug!(head = edge.head, candidates = candidates.len(), min_leaves, "random centroid edge");
    Ok(edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{LoadOptions, tree_from_newick};
    use crate::taxon::TaxonNamespace;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn loaded(newick: &str) -> Tree {
        let mut tree = tree_from_newick(newick, &LoadOptions::default()).unwrap();
        tree.update_bipartitions().unwrap();
        tree
    }

    const TREES: [&str; 4] = [
        "(((A,B),(C,D)),((E,F),(G,H)));",
        "(A,(B,(C,(D,(E,(F,(G,(H,I))))))));",
        "((A,B),(C,(D,E)),((F,G),(H,(I,J))));",
        "((A,(B,C)),(D,(E,(F,(G,H)))),(I,(J,(K,L))));",
    ];

    #[test]
    fn test_centroid_is_optimal() {
        for newick in TREES {
            let tree = loaded(newick);
            let bips = tree.bipartitions().unwrap();
            let n = tree.num_leaves();
            let chosen = centroid_edge(&tree).unwrap();
            let chosen_imbalance = n.abs_diff(2 * bips.leaf_count(chosen.head));

            for &head in bips.postorder() {
                if head == tree.root() {
                    continue;
                }
                assert!(n.abs_diff(2 * bips.leaf_count(head)) >= chosen_imbalance, "{newick}");
            }
        }
    }

    #[test]
    fn test_centroid_of_balanced_tree_halves_it() {
        let tree = loaded(TREES[0]);
        let edge = centroid_edge(&tree).unwrap();
        assert_eq!(tree.bipartitions().unwrap().leaf_count(edge.head), 4);
    }

    #[test]
    fn test_centroid_ties_resolve_to_first_in_postorder() {
        // loads as ((A,B),(C,D),(E,F)); the edges above the three cherries
        // all leave an imbalance of 2, (A,B) comes first
        let tree = loaded("((A,B),(C,D),(E,F));");
        let bips = tree.bipartitions().unwrap();
        let edge = centroid_edge(&tree).unwrap();

        let labels: Vec<_> = bips.leafset(edge.head).ones().collect();
        let namespace = tree.namespace();
        assert_eq!(labels, vec![namespace.index_of("A").unwrap(), namespace.index_of("B").unwrap()]);
        assert_eq!(centroid_edge(&tree).unwrap(), edge);
    }

    #[test]
    fn test_centroid_needs_two_leaves() {
        let namespace = Arc::new(TaxonNamespace::from_labels(["A"]).unwrap());
        let mut tree = Tree::single_leaf(namespace, 0).unwrap();
        tree.update_bipartitions().unwrap();
        assert!(matches!(centroid_edge(&tree), Err(TreeError::TooFewLeaves { leaves: 1 })));
    }

    #[test]
    fn test_centroid_on_stale_tree_fails() {
        let mut tree = loaded(TREES[0]);
        tree.add_internal(tree.root(), None).unwrap();
        assert!(matches!(centroid_edge(&tree), Err(TreeError::StaleBipartitions)));
    }

    #[test]
    fn test_random_centroid_respects_bound() {
        let mut rng = StdRng::seed_from_u64(42);
        for newick in TREES {
            let tree = loaded(newick);
            let n = tree.num_leaves();
            let bips = tree.bipartitions().unwrap();
            for bound in 1..=n / 2 {
                match random_centroid_edge(&tree, bound, &mut rng) {
                    Ok(edge) => {
                        let below = bips.leaf_count(edge.head);
                        assert!(below >= bound && n - below >= bound);
                        assert!(!tree[edge.head].is_leaf());
                    }
                    Err(TreeError::NoEligibleEdge { min_leaves }) => {
                        assert_eq!(min_leaves, bound);
                        assert!(balanced_edges(&tree, bound).unwrap().is_empty());
                    }
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
        }
    }

    #[test]
    fn test_random_centroid_is_reproducible() {
        let tree = loaded(TREES[3]);
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| random_centroid_edge(&tree, 2, &mut rng).unwrap().head)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn test_random_centroid_without_candidates() {
        let tree = loaded("(A,B,C);");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            random_centroid_edge(&tree, 1, &mut rng),
            Err(TreeError::NoEligibleEdge { min_leaves: 1 })
        ));
    }
}
