use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use phylotree::tree::Tree as PhyloTree;
use tracing::info;

use crate::compare::Comparison;
use crate::error::{Result, TreeError};
use crate::taxon::TaxonNamespace;
use crate::tree::{NodeId, Tree};

/// Normalizations applied to every tree right after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Maximum number of children per node; wider nodes are resolved.
    pub polytomy_limit: usize,
    /// Treat the tree as unrooted whatever the newick says.
    pub force_unrooted: bool,
    /// Dissolve one child of a two-child root into the root.
    pub collapse_basal_bifurcation: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { polytomy_limit: 2, force_unrooted: true, collapse_basal_bifurcation: true }
    }
}

impl LoadOptions {
    /// Loading for comparison: unrooted, basal bifurcation collapsed,
    /// multifurcations kept as they are.
    pub fn unresolved() -> Self {
        LoadOptions { polytomy_limit: usize::MAX, ..Self::default() }
    }
}

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Remove bracketed comments from Newick strings.
///
/// Rooting tags such as `[&R]` and annotations like `:[&rate=0.123]2.45`
/// are dropped while the branch lengths around them are kept.
fn strip_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut depth = 0usize;

    for ch in newick.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Open `path` for reading, decompressing it if it ends with `.gz`.
pub(crate) fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let input: Box<dyn Read> = if is_gz(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(input)
}

/// Read a newick file into a string. Files ending in `.gz` are decompressed.
pub fn read_newick<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut content = String::new();
    open_reader(path.as_ref())?.read_to_string(&mut content)?;
    Ok(content)
}

fn parse_phylo(newick: &str) -> Result<PhyloTree> {
    let cleaned = strip_annotations(newick);
    PhyloTree::from_newick(cleaned.trim()).map_err(|e| TreeError::Newick(e.to_string()))
}

/// Leaf labels of a parsed tree, rejecting unnamed and repeated leaves.
fn phylo_leaf_labels(phylo: &PhyloTree) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    phylo
        .get_leaves()
        .iter()
        .map(|leaf_id| -> Result<String> {
            let node = phylo.get(leaf_id).map_err(phylo_error)?;
            let label = node
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .ok_or(TreeError::UnlabelledLeaf)?;
            if !seen.insert(label.clone()) {
                return Err(TreeError::DuplicateTaxon(label));
            }
            Ok(label)
        })
        .collect()
}

fn phylo_error(e: phylotree::tree::TreeError) -> TreeError {
    TreeError::Newick(e.to_string())
}

/// Copy a parsed tree into the arena representation over `namespace`.
fn convert(phylo: &PhyloTree, namespace: Arc<TaxonNamespace>) -> Result<Tree> {
    let phylo_root = phylo.get_root().map_err(phylo_error)?;
    let root = phylo.get(&phylo_root).map_err(phylo_error)?;

    let taxon_of = |name: &Option<String>| -> Result<usize> {
        let label = name.as_deref().ok_or(TreeError::UnlabelledLeaf)?;
        namespace
            .index_of(label)
            .ok_or_else(|| TreeError::UnknownLabel(label.to_string()))
    };

    if root.children.is_empty() {
        let taxon = taxon_of(&root.name)?;
        return Tree::single_leaf(Arc::clone(&namespace), taxon);
    }

    let mut tree = Tree::new(Arc::clone(&namespace));
    let mut stack: Vec<(usize, NodeId)> = root
        .children
        .iter()
        .rev()
        .map(|&c| (c, tree.root()))
        .collect();

    while let Some((phylo_id, parent)) = stack.pop() {
        let node = phylo.get(&phylo_id).map_err(phylo_error)?;
        if node.children.is_empty() {
            tree.add_leaf(parent, taxon_of(&node.name)?, node.parent_edge)?;
        } else {
            let id = tree.add_internal(parent, node.parent_edge)?;
            stack.extend(node.children.iter().rev().map(|&c| (c, id)));
        }
    }
    tree.set_rooted(phylo.is_rooted().map_err(phylo_error)?);
    Ok(tree)
}

fn normalize(tree: &mut Tree, opts: &LoadOptions) -> Result<()> {
    if opts.force_unrooted {
        tree.set_rooted(false);
    }
    tree.suppress_unifurcations();
    tree.resolve_polytomies(opts.polytomy_limit)?;
    if opts.collapse_basal_bifurcation {
        tree.collapse_basal_bifurcation();
    }
    Ok(())
}

/// Parse a single newick tree with its own namespace.
pub fn tree_from_newick(newick: &str, opts: &LoadOptions) -> Result<Tree> {
    let mut trees = trees_from_newick(&[newick], opts)?;
    trees.pop().ok_or(TreeError::EmptyTree)
}

/// Parse several newick trees into one shared, alphabetically sorted
/// namespace built over the union of their leaf labels.
///
/// # Errors
/// - `TreeError::Newick` if a string is not valid newick
/// - `TreeError::UnlabelledLeaf` / `TreeError::DuplicateTaxon` on bad leaves
pub fn trees_from_newick<S: AsRef<str>>(newicks: &[S], opts: &LoadOptions) -> Result<Vec<Tree>> {
    let parsed = newicks
        .iter()
        .map(|n| parse_phylo(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let mut labels = BTreeSet::new();
    for phylo in &parsed {
        labels.extend(phylo_leaf_labels(phylo)?);
    }
    let namespace = Arc::new(TaxonNamespace::from_labels(labels)?);

    parsed
        .iter()
        .map(|phylo| -> Result<Tree> {
            let mut tree = convert(phylo, Arc::clone(&namespace))?;
            normalize(&mut tree, opts)?;
            Ok(tree)
        })
        .collect()
}

/// Load one tree file.
pub fn load_tree<P: AsRef<Path>>(path: P, opts: &LoadOptions) -> Result<Tree> {
    let mut trees = load_trees(&[path], opts)?;
    trees.pop().ok_or(TreeError::EmptyTree)
}

/// Load several tree files into one shared namespace.
pub fn load_trees<P: AsRef<Path>>(paths: &[P], opts: &LoadOptions) -> Result<Vec<Tree>> {
    let newicks = paths.iter().map(read_newick).collect::<Result<Vec<_>>>()?;
    let trees = trees_from_newick(newicks.as_slice(), opts)?;
    info!(
        trees = trees.len(),
        taxa = trees.first().map_or(0, |t| t.namespace().len()),
        "loaded trees"
    );
    Ok(trees)
}

/// Open `path` for writing, gzip-compressed if it ends with `.gz`.
pub(crate) fn create_writer(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Err(TreeError::InvalidArgument("writing to stdout is not supported"));
    }

    let file = File::create(path)?;
    let out: Box<dyn Write> = if is_gz(path) {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };
    Ok(out)
}

/// Write a tree as a single newick line.
pub fn write_tree<P: AsRef<Path>>(tree: &Tree, path: P) -> Result<()> {
    let mut out = create_writer(path.as_ref())?;
    writeln!(&mut out, "{}", tree.to_newick()?)?;
    out.flush()?;
    Ok(())
}

/// Write the leaf labels of every tree to `dir/subset_<n>.txt`, one label per
/// line, `n` counting from 1. Returns the written paths in order.
pub fn write_label_subsets<P: AsRef<Path>>(dir: P, trees: &[Tree]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir.as_ref())?;
    trees
        .iter()
        .enumerate()
        .map(|(n, tree)| -> Result<PathBuf> {
            let path = dir.as_ref().join(format!("subset_{}.txt", n + 1));
            let mut out = create_writer(&path)?;
            writeln!(&mut out, "{}", tree.leaf_labels()?.iter().join("\n"))?;
            out.flush()?;
            Ok(path)
        })
        .collect()
}

/// Write one row per compared tree as TSV.
/// If `path` ends with `.gz`, the output is gzip-compressed.
pub fn write_comparisons_tsv<P: AsRef<Path>>(path: P, rows: &[(String, Comparison)]) -> Result<()> {
    let mut out = create_writer(path.as_ref())?;

    writeln!(
        &mut out,
        "tree\tshared_leaves\tinternal_edges_reference\tinternal_edges_tree\tfalse_positives\tfalse_negatives\tnormalized_distance"
    )?;
    for (name, c) in rows {
        writeln!(
            &mut out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            name,
            c.shared_leaves,
            c.internal_edges_a,
            c.internal_edges_b,
            c.false_positives,
            c.false_negatives,
            c.normalized_distance
        )?;
    }

    out.flush()?;
    Ok(())
}
