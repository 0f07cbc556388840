//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `taxon`: shared, alphabetically sorted leaf label index space.
//! - `bitset`: compact bitset representation for leaf sets.
//! - `tree`: arena tree with stamped, staleness-checked bipartitions.
//! - `bipartition`: per-edge leaf bitsets, recomputed in one postorder pass.
//! - `centroid`: deterministic and randomized centroid edge selection.
//! - `split`: cutting a tree in two at an edge, moving its nodes.
//! - `decompose`: the three decomposition policies.
//! - `snapshot`: canonical split sets for comparisons.
//! - `compare`: false positive / false negative split counts on shared leaves.
//! - `io`: newick loading with normalizations, tree and report writers.
//! - `sequences`: FASTA subsets for decomposed guide trees.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bipartition;
pub mod bitset;
pub mod centroid;
pub mod compare;
pub mod decompose;
pub mod error;
pub mod io;
pub mod sequences;
pub mod snapshot;
pub mod split;
pub mod taxon;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use centroid::{CentroidMode, centroid_edge, random_centroid_edge};
pub use compare::{Comparison, compare, compare_many};
pub use decompose::{decompose, decompose_exact_count, decompose_recursive_max_size};
pub use error::{Result, TreeError};
pub use io::{LoadOptions, load_tree, load_trees, tree_from_newick, trees_from_newick};
pub use sequences::decompose_guide_tree;
pub use snapshot::TreeSnapshot;
pub use taxon::{TaxonId, TaxonNamespace};
pub use tree::{Edge, NodeId, Tree};
