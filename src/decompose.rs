//! Decomposition of a tree into disjoint sub-trees.
//!
//! Three stopping policies share the same working collection, initialised to
//! the input tree and grown by repeatedly cutting one member at a centroid
//! edge:
//!
//! | Policy                          | Picks              | Stops when                                  |
//! |---------------------------------|--------------------|---------------------------------------------|
//! | [`decompose`]                   | largest tree       | count reached, or largest fits the size     |
//! | [`decompose_exact_count`]       | largest tree       | exactly `num_subsets` trees                 |
//! | [`decompose_recursive_max_size`]| every oversized one| no tree exceeds the size                    |
//!
//! Whatever the policy, the leaf sets of the returned trees partition the
//! leaf set of the input.

use std::cmp::Reverse;

use itertools::Itertools;
use rand::Rng;
use tracing::{debug, info};

use crate::centroid::{CentroidMode, centroid_edge, random_centroid_edge};
use crate::error::{Result, TreeError};
use crate::tree::{Edge, Tree};

fn split_at_centroid(tree: Tree) -> Result<(Tree, Tree)> {
    let edge = centroid_edge(&tree)?;
    tree.split(edge)
}

/// Splits the largest tree at its centroid until there are `max_num_subsets`
/// trees, stopping early once the largest tree has at most `max_subset_size`
/// leaves. Either bound may be absent, not both.
///
/// Among equally large trees the one found first in the collection is split.
///
/// # Errors
/// - `TreeError::InvalidArgument` if both bounds are missing or the size is 0
/// - `TreeError::TooManySubsets` if only a count is given and it exceeds the
///   number of leaves
pub fn decompose(mut tree: Tree, max_subset_size: Option<usize>, max_num_subsets: Option<usize>) -> Result<Vec<Tree>> {
    match (max_subset_size, max_num_subsets) {
        (None, None) => {
            return Err(TreeError::InvalidArgument("a maximum subset size or a maximum number of subsets is required"));
        }
        (Some(0), _) => return Err(TreeError::InvalidArgument("maximum subset size must be positive")),
        (None, Some(requested)) if requested > tree.num_leaves() => {
            return Err(TreeError::TooManySubsets { requested, leaves: tree.num_leaves() });
        }
        _ => {}
    }
    tree.ensure_bipartitions()?;
    let leaves = tree.num_leaves();

    let mut trees = vec![tree];
    while max_num_subsets.is_none_or(|n| trees.len() < n) {
        let largest = trees
            .iter()
            .position_min_by_key(|t| Reverse(t.num_leaves()))
            .ok_or(TreeError::EmptyTree)?;
        if max_subset_size.is_some_and(|k| trees[largest].num_leaves() <= k) {
            break;
        }
        let (remaining, detached) = split_at_centroid(trees.remove(largest))?;
        trees.push(remaining);
        trees.push(detached);
    }

    info!(leaves, subsets = trees.len(), ?max_subset_size, ?max_num_subsets, "decomposed tree");
    Ok(trees)
}

/// Splits the largest tree at its centroid until there are exactly
/// `num_subsets` trees, however small they get.
///
/// # Errors
/// - `TreeError::InvalidArgument` if `num_subsets` is 0
/// - `TreeError::TooManySubsets` if `num_subsets` exceeds the number of leaves
pub fn decompose_exact_count(mut tree: Tree, num_subsets: usize) -> Result<Vec<Tree>> {
    if num_subsets == 0 {
        return Err(TreeError::InvalidArgument("number of subsets must be positive"));
    }
    let leaves = tree.num_leaves();
    if num_subsets > leaves {
        return Err(TreeError::TooManySubsets { requested: num_subsets, leaves });
    }
    tree.ensure_bipartitions()?;

    let mut trees = vec![tree];
    while trees.len() < num_subsets {
        // stable, so equally large trees keep their collection order
        trees.sort_by_key(|t| Reverse(t.num_leaves()));
        let (remaining, detached) = split_at_centroid(trees.remove(0))?;
        trees.push(remaining);
        trees.push(detached);
    }

    info!(leaves, subsets = trees.len(), "decomposed tree into exact count");
    Ok(trees)
}

/// Picks the edge to cut under `mode`. A randomized pick keeps at least a
/// third of `max_subset_size` leaves on both sides and falls back to the
/// deterministic centroid when no edge allows it.
fn select_edge<R: Rng + ?Sized>(tree: &Tree, max_subset_size: usize, mode: CentroidMode, rng: &mut R) -> Result<Edge> {
    match mode {
        CentroidMode::Deterministic => centroid_edge(tree),
        CentroidMode::Randomized => {
            let bound = max_subset_size.div_ceil(3);
            match random_centroid_edge(tree, bound, rng) {
                Err(TreeError::NoEligibleEdge { min_leaves }) => {
                    debug!(min_leaves, leaves = tree.num_leaves(), "no balanced edge, using centroid");
                    centroid_edge(tree)
                }
                picked => picked,
            }
        }
    }
}

/// Cuts every tree with more than `max_subset_size` leaves, recursing into
/// both halves, until all pieces fit. Pieces are returned in left-to-right
/// recursion order, the remaining half of a cut before the detached one.
///
/// # Errors
/// `TreeError::InvalidArgument` if `max_subset_size` is 0.
pub fn decompose_recursive_max_size<R: Rng + ?Sized>(
    mut tree: Tree,
    max_subset_size: usize,
    mode: CentroidMode,
    rng: &mut R,
) -> Result<Vec<Tree>> {
    if max_subset_size == 0 {
        return Err(TreeError::InvalidArgument("maximum subset size must be positive"));
    }
    tree.ensure_bipartitions()?;
    let leaves = tree.num_leaves();

    let mut pieces = Vec::new();
    let mut pending = vec![tree];
    while let Some(tree) = pending.pop() {
        if tree.num_leaves() <= max_subset_size {
            pieces.push(tree);
            continue;
        }
        let edge = select_edge(&tree, max_subset_size, mode, &mut *rng)?;
        let (remaining, detached) = tree.split(edge)?;
        pending.push(detached);
        pending.push(remaining);
    }

    info!(leaves, subsets = pieces.len(), max_subset_size, ?mode, "decomposed tree recursively");
    Ok(pieces)
}
