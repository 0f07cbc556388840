//! Topological comparison of two trees over their shared taxa.
//!
//! Both trees are restricted to the labels they have in common, re-indexed
//! into one fresh namespace and treated as unrooted. Their canonical split
//! snapshots are then compared:
//!
//! - **false negatives**: splits of the reference missing from the other tree
//! - **false positives**: splits of the other tree missing from the reference
//! - **normalized distance**: `(fp + fn) / (internal edges A + internal edges B)`
//!
//! # Example
//! ```text
//! Reference:  ((A,B),C,(D,E))    splits: {A,B}, {D,E}
//! Other:      ((A,C),B,(D,E))    splits: {A,C}, {D,E}
//!
//! fn = 1 ({A,B}), fp = 1 ({A,C}), distance = 2 / 4 = 0.5
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::snapshot::TreeSnapshot;
use crate::taxon::TaxonNamespace;
use crate::tree::Tree;

/// Outcome of comparing two trees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub shared_leaves: usize,
    pub internal_edges_a: usize,
    pub internal_edges_b: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub normalized_distance: f64,
}

impl Comparison {
    /// Robinson-Foulds distance on the shared leaves.
    pub fn robinson_foulds(&self) -> usize {
        self.false_positives + self.false_negatives
    }

    /// Flattened form `(nl, ei1, ei2, fp, fn, rf)`.
    pub fn as_tuple(&self) -> (usize, usize, usize, usize, usize, f64) {
        (
            self.shared_leaves,
            self.internal_edges_a,
            self.internal_edges_b,
            self.false_positives,
            self.false_negatives,
            self.normalized_distance,
        )
    }
}

/// Splits of `comparison` absent from `reference` (false positives) and
/// splits of `reference` absent from `comparison` (false negatives).
///
/// Both snapshots must index their leaves in the same namespace.
pub fn false_positives_and_negatives(reference: &TreeSnapshot, comparison: &TreeSnapshot) -> (usize, usize) {
    let shared = reference.parts.intersection(&comparison.parts).count();
    (comparison.parts.len() - shared, reference.parts.len() - shared)
}

/// Restricts `tree` to `namespace`, unrooted, with fresh bipartitions.
fn unrooted_restriction(tree: &Tree, namespace: &Arc<TaxonNamespace>) -> Result<Tree> {
    let mut restricted = tree.restricted_to(Arc::clone(namespace))?;
    restricted.set_rooted(false);
    restricted.collapse_basal_bifurcation();
    restricted.update_bipartitions()?;
    Ok(restricted)
}

/// Compares `tree_b` against the reference `tree_a` on their common leaves.
///
/// When neither restricted tree has an internal edge the distance is 0.0.
///
/// # Errors
/// - `TreeError::UnknownTaxon` if a leaf's taxon is missing from its tree's namespace
/// - `TreeError::EmptyTree` if the trees share no leaf
pub fn compare(tree_a: &Tree, tree_b: &Tree) -> Result<Comparison> {
    let labels_a: HashSet<&str> = tree_a.leaf_labels()?.into_iter().collect();
    let labels_b: HashSet<&str> = tree_b.leaf_labels()?.into_iter().collect();
    debug!(
        leaves_a = labels_a.len(),
        leaves_b = labels_b.len(),
        "comparing trees"
    );

    let common = TaxonNamespace::sorted(labels_a.intersection(&labels_b).copied())?;
    let namespace = Arc::new(common);

    let restricted_a = unrooted_restriction(tree_a, &namespace)?;
    let restricted_b = unrooted_restriction(tree_b, &namespace)?;
    let snap_a = TreeSnapshot::from_tree(&restricted_a)?;
    let snap_b = TreeSnapshot::from_tree(&restricted_b)?;

    let (false_positives, false_negatives) = false_positives_and_negatives(&snap_a, &snap_b);
    let edges = snap_a.internal_edges + snap_b.internal_edges;
    let normalized_distance = if edges == 0 {
        0.0
    } else {
        (false_positives + false_negatives) as f64 / edges as f64
    };

    Ok(Comparison {
        shared_leaves: namespace.len(),
        internal_edges_a: snap_a.internal_edges,
        internal_edges_b: snap_b.internal_edges,
        false_positives,
        false_negatives,
        normalized_distance,
    })
}

/// Compares every tree against `reference` in parallel; results follow the
/// input order.
pub fn compare_many(reference: &Tree, trees: &[Tree]) -> Vec<Result<Comparison>> {
    trees
        .par_iter()
        .map(|tree| compare(reference, tree))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use crate::io::{LoadOptions, tree_from_newick, trees_from_newick};
    use itertools::Itertools;

    fn pair(a: &str, b: &str) -> (Tree, Tree) {
        let mut trees = trees_from_newick(&[a, b], &LoadOptions::default()).unwrap();
        let b = trees.pop().unwrap();
        let a = trees.pop().unwrap();
        (a, b)
    }

    #[test]
    fn test_identical_trees() {
        let newick = "((A,B),(C,D),((E,F),(G,(H,(I,J)))));";
        let (a, b) = pair(newick, newick);
        let cmp = compare(&a, &b).unwrap();

        assert_eq!(cmp.shared_leaves, 10);
        assert_eq!(cmp.robinson_foulds(), 0);
        assert_eq!(cmp.normalized_distance, 0.0);
        assert_eq!(cmp.internal_edges_a, 7);
        assert_eq!(cmp.internal_edges_a, cmp.internal_edges_b);
    }

    #[test]
    fn test_one_differing_split() {
        let (a, b) = pair("((A,B),C,(D,E));", "((A,C),B,(D,E));");
        let cmp = compare(&a, &b).unwrap();

        assert_eq!(cmp.false_positives, 1);
        assert_eq!(cmp.false_negatives, 1);
        assert_eq!(cmp.robinson_foulds(), 2);
        assert_eq!(cmp.internal_edges_a, 2);
        assert_eq!(cmp.normalized_distance, 0.5);
    }

    #[test]
    fn test_rooting_does_not_matter() {
        let (a, b) = pair("(((A,B),C),(D,E));", "((A,B),(C,(D,E)));");
        assert_eq!(compare(&a, &b).unwrap().robinson_foulds(), 0);
    }

    #[test]
    fn test_restricts_to_common_leaves() {
        // X and Y only exist on one side each; on {A..E} the trees agree
        let (a, b) = pair("((A,B),(X,C),(D,E));", "((A,B),C,((D,Y),E));");
        let cmp = compare(&a, &b).unwrap();

        assert_eq!(cmp.shared_leaves, 5);
        assert_eq!(cmp.robinson_foulds(), 0);
        assert_eq!(cmp.internal_edges_a, 2);
        assert_eq!(cmp.internal_edges_b, 2);
    }

    #[test]
    fn test_trees_with_separate_namespaces() {
        let a = tree_from_newick("((A,B),C,(D,E));", &LoadOptions::default()).unwrap();
        let b = tree_from_newick("((E,D),C,(B,A));", &LoadOptions::default()).unwrap();
        assert!(!Arc::ptr_eq(a.namespace(), b.namespace()));
        assert_eq!(compare(&a, &b).unwrap().robinson_foulds(), 0);
    }

    #[test]
    fn test_star_trees_have_zero_distance() {
        let (a, b) = pair("(A,B,C);", "(C,B,A);");
        let cmp = compare(&a, &b).unwrap();
        assert_eq!(cmp.internal_edges_a + cmp.internal_edges_b, 0);
        assert_eq!(cmp.normalized_distance, 0.0);
    }

    #[test]
    fn test_disjoint_trees_fail() {
        let (a, b) = pair("((A,B),C);", "((X,Y),Z);");
        assert!(matches!(compare(&a, &b), Err(TreeError::EmptyTree)));
    }

    // Robinson-Foulds distances according to
    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    #[test]
    fn test_robinson_foulds_treedist() {
        let trees = [
            "(A,(B,(H,(D,(J,(((G,E),(F,I)),C))))));",
            "(A,(B,(D,((J,H),(((G,E),(F,I)),C)))));",
            "(A,(B,(D,(H,(J,(((G,E),(F,I)),C))))));",
            "(A,(B,(E,(G,((F,I),((J,(H,D)),C))))));",
            "(A,(B,(E,(G,((F,I),(((J,H),D),C))))));",
            "(A,(B,(E,((F,I),(G,((J,(H,D)),C))))));",
        ];
        let rfs = [
            [0, 4, 2, 10, 10, 10],
            [4, 0, 2, 10, 8, 10],
            [2, 2, 0, 10, 10, 10],
            [10, 10, 10, 0, 2, 2],
            [10, 8, 10, 2, 0, 4],
            [10, 10, 10, 2, 4, 0],
        ];

        let loaded = trees_from_newick(&trees, &LoadOptions::default()).unwrap();
        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let cmp = compare(&loaded[i0], &loaded[i1]).unwrap();
            assert_eq!(cmp.robinson_foulds(), rfs[i0][i1], "trees {i0} and {i1}");
            assert_eq!(cmp.internal_edges_a, 7);
        }
    }

    #[test]
    fn test_compare_many_keeps_order() {
        let newicks = ["((A,B),C,(D,E));", "((A,C),B,(D,E));", "((A,B),C,(D,E));", "((A,D),C,(B,E));"];
        let mut trees = trees_from_newick(&newicks, &LoadOptions::default()).unwrap();
        let reference = trees.remove(0);

        let distances: Vec<usize> = compare_many(&reference, &trees)
            .into_iter()
            .map(|r| r.unwrap().robinson_foulds())
            .collect();
        assert_eq!(distances, vec![2, 0, 4]);
    }
}
