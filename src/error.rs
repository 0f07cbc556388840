//! Error type shared by every module of the crate.

use thiserror::Error;

use crate::taxon::TaxonId;
use crate::tree::NodeId;

/// Errors that can occur when loading, decomposing or comparing trees.
#[derive(Error, Debug)]
pub enum TreeError {
    /// A centroid edge was requested on a tree without any edge to cut
    #[error("Tree has {leaves} leaves, at least 2 are needed to pick a centroid edge.")]
    TooFewLeaves { leaves: usize },
    /// No internal edge keeps `min_leaves` leaves on both of its sides
    #[error("No internal edge leaves at least {min_leaves} leaves on both sides.")]
    NoEligibleEdge { min_leaves: usize },
    /// More subsets were requested than there are leaves to put in them
    #[error("Cannot produce {requested} subsets from a tree with {leaves} leaves.")]
    TooManySubsets { requested: usize, leaves: usize },
    /// Bipartitions were read after the tree structure changed
    #[error("The bipartitions of this tree are stale, refresh them after mutating the tree.")]
    StaleBipartitions,
    /// An edge was used on a tree it was not taken from, or after a mutation
    #[error("Edge {tail} -> {head} does not belong to the current tree structure.")]
    StaleEdge { head: NodeId, tail: NodeId },
    /// A leaf refers to a taxon index the namespace does not know
    #[error("Taxon index {0} is not part of the taxon namespace.")]
    UnknownTaxon(TaxonId),
    /// A label was looked up in a namespace that does not contain it
    #[error("Taxon label {0:?} is not part of the taxon namespace.")]
    UnknownLabel(String),
    /// The same label was used for two taxa
    #[error("Taxon label {0:?} appears more than once.")]
    DuplicateTaxon(String),
    /// A leaf in the input tree carries no label
    #[error("All your leaf nodes must be named.")]
    UnlabelledLeaf,
    /// The requested node does not exist in the tree
    #[error("There is no node with index: {0}")]
    NodeNotFound(NodeId),
    /// Only non-root nodes head an edge
    #[error("Node {0} is the root and has no edge above it.")]
    RootEdge(NodeId),
    /// Children can only be attached to internal nodes
    #[error("Node {0} is a leaf and cannot have children.")]
    LeafParent(NodeId),
    /// The tree ended up without a single leaf
    #[error("This tree has no leaves.")]
    EmptyTree,
    /// Caller supplied a meaningless combination of parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The newick string could not be parsed
    #[error("Could not parse newick: {0}")]
    Newick(String),
    /// A subset asked for a taxon that has no sequence
    #[error("No sequence found for taxon {0:?}.")]
    MissingSequence(String),
    /// The sequence file is not valid FASTA
    #[error("Malformed FASTA: {0}")]
    Fasta(String),
    /// There was a [`std::io::Error`] when reading or writing files
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TreeError>;
