//! Python binding layer for tree decomposition and comparison.
//!
//! Provides Python functions that load newick files, decompose them and
//! return the leaf labels of every sub-tree, or compare trees on their
//! shared leaves.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::centroid::CentroidMode;
use crate::compare;
use crate::decompose::{decompose, decompose_exact_count, decompose_recursive_max_size};
use crate::error::TreeError;
use crate::io::{LoadOptions, load_tree, load_trees};
use crate::sequences;
use crate::tree::Tree;

type ComparisonTuple = (usize, usize, usize, usize, usize, f64);

fn value_error(e: TreeError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn load(path: &str) -> PyResult<Tree> {
    load_tree(path, &LoadOptions::default()).map_err(value_error)
}

fn label_subsets(trees: &[Tree]) -> PyResult<Vec<Vec<String>>> {
    trees
        .iter()
        .map(|t| {
            t.leaf_labels()
                .map(|labels| labels.into_iter().map(String::from).collect())
                .map_err(value_error)
        })
        .collect()
}

/// Decompose a tree by repeatedly splitting its largest sub-tree.
///
/// Args:
///     path: Newick file of the tree (optionally gzipped)
///     max_subset_size: Stop once the largest sub-tree has at most this many leaves
///     max_num_subsets: Stop once there are this many sub-trees
///
/// Returns:
///     A list of leaf label lists, one per sub-tree
///
/// Raises:
///     ValueError: If both bounds are missing, or the file cannot be loaded
#[pyfunction]
#[pyo3(signature = (path, max_subset_size=None, max_num_subsets=None))]
fn decompose_tree(path: String, max_subset_size: Option<usize>, max_num_subsets: Option<usize>) -> PyResult<Vec<Vec<String>>> {
    let trees = decompose(load(&path)?, max_subset_size, max_num_subsets).map_err(value_error)?;
    label_subsets(&trees)
}

/// Decompose a tree into exactly `num_subsets` sub-trees.
///
/// Raises:
///     ValueError: If `num_subsets` is 0 or larger than the number of leaves
#[pyfunction]
fn decompose_tree_num_subsets(path: String, num_subsets: usize) -> PyResult<Vec<Vec<String>>> {
    let trees = decompose_exact_count(load(&path)?, num_subsets).map_err(value_error)?;
    label_subsets(&trees)
}

/// Recursively split a tree until no sub-tree exceeds `max_subset_size` leaves.
///
/// Args:
///     path: Newick file of the tree
///     max_subset_size: Maximum number of leaves per sub-tree
///     mode: "centroid" for the most balanced edge, "random" for a random
///         edge keeping a third of `max_subset_size` leaves on both sides
///     seed: Seed of the random mode; drawn from the OS when omitted
#[pyfunction]
#[pyo3(signature = (path, max_subset_size, mode="centroid", seed=None))]
fn decompose_tree_max_subset_size(
    path: String,
    max_subset_size: usize,
    mode: &str,
    seed: Option<u64>,
) -> PyResult<Vec<Vec<String>>> {
    let mode = match mode {
        "centroid" => CentroidMode::Deterministic,
        "random" => CentroidMode::Randomized,
        other => {
            return Err(PyValueError::new_err(format!(
                "Unknown mode '{}', expected 'centroid' or 'random'",
                other
            )));
        }
    };
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let trees = decompose_recursive_max_size(load(&path)?, max_subset_size, mode, &mut rng).map_err(value_error)?;
    label_subsets(&trees)
}

/// Decompose a guide tree and write one FASTA subset file per sub-tree.
///
/// Returns:
///     The paths of the written `subset_<n>.txt` files
#[pyfunction]
#[pyo3(signature = (subsets_dir, sequences_path, guide_tree_path, max_subset_size=None, max_num_subsets=None))]
fn decompose_guide_tree(
    subsets_dir: String,
    sequences_path: String,
    guide_tree_path: String,
    max_subset_size: Option<usize>,
    max_num_subsets: Option<usize>,
) -> PyResult<Vec<String>> {
    let paths = sequences::decompose_guide_tree(
        subsets_dir,
        sequences_path,
        guide_tree_path,
        max_subset_size,
        max_num_subsets,
    )
    .map_err(value_error)?;
    Ok(paths.iter().map(|p| p.to_string_lossy().into_owned()).collect())
}

/// Compare two trees on their shared leaves.
///
/// Returns:
///     (shared_leaves, internal_edges_a, internal_edges_b, false_positives,
///     false_negatives, normalized_distance) with `path_a` as the reference
#[pyfunction]
fn compare_trees(path_a: String, path_b: String) -> PyResult<ComparisonTuple> {
    let trees = load_trees(&[path_a, path_b], &LoadOptions::unresolved()).map_err(value_error)?;
    let c = compare::compare(&trees[0], &trees[1]).map_err(value_error)?;
    Ok(c.as_tuple())
}

/// Compare every tree against a reference, in parallel.
///
/// Returns:
///     One comparison tuple per path, in input order
#[pyfunction]
fn compare_many(reference: String, paths: Vec<String>) -> PyResult<Vec<ComparisonTuple>> {
    let all: Vec<&String> = std::iter::once(&reference).chain(paths.iter()).collect();
    let mut trees = load_trees(&all, &LoadOptions::unresolved()).map_err(value_error)?;
    let reference_tree = trees.remove(0);

    compare::compare_many(&reference_tree, &trees)
        .into_iter()
        .map(|r| r.map(|c| c.as_tuple()).map_err(value_error))
        .collect()
}

#[pymodule]
fn rust_python_tree_decomposition(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decompose_tree, m)?)?;
    m.add_function(wrap_pyfunction!(decompose_tree_num_subsets, m)?)?;
    m.add_function(wrap_pyfunction!(decompose_tree_max_subset_size, m)?)?;
    m.add_function(wrap_pyfunction!(decompose_guide_tree, m)?)?;
    m.add_function(wrap_pyfunction!(compare_trees, m)?)?;
    m.add_function(wrap_pyfunction!(compare_many, m)?)?;
    Ok(())
}
