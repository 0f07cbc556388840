//! Arena-backed phylogenetic tree with per-edge leaf bitsets.
//!
//! # Layout
//! All nodes live in one `Vec<Node>` and refer to each other by [`NodeId`].
//! A leaf carries a [`TaxonId`] into the tree's shared [`TaxonNamespace`];
//! internal nodes carry none. The edge above a node is identified by that
//! node (its *head*); the root has no edge.
//!
//! # Staleness
//! Every structural mutation gives the tree a fresh *stamp*. Derived data
//! ([`Bipartitions`]) and [`Edge`] handles remember the stamp they were taken
//! at and are rejected once the tree has changed, so stale leaf sets surface
//! as [`TreeError::StaleBipartitions`] / [`TreeError::StaleEdge`] instead of
//! silently wrong answers.
//!
//! # Ownership on split
//! [`Tree::split`] consumes the tree and moves every node into exactly one of
//! the two resulting trees, see [`crate::split`].

use std::ops::Index;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bipartition::{self, Bipartitions};
use crate::error::{Result, TreeError};
use crate::taxon::{TaxonId, TaxonNamespace};

/// Index of a node in its tree's arena.
pub type NodeId = usize;

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Stamps are unique across all trees of the process, so an edge taken from
/// one tree can never be mistaken for an edge of another.
fn next_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

fn join_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (x, None) => x,
        (None, y) => y,
    }
}

/// A node of a [`Tree`]. Leaves are exactly the nodes carrying a taxon.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    taxon: Option<TaxonId>,
    length: Option<f64>,
}

impl Node {
    fn internal(length: Option<f64>) -> Self {
        Node { parent: None, children: Vec::new(), taxon: None, length }
    }

    fn leaf(taxon: TaxonId, length: Option<f64>) -> Self {
        Node { parent: None, children: Vec::new(), taxon: Some(taxon), length }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn taxon(&self) -> Option<TaxonId> {
        self.taxon
    }

    /// Length of the edge above this node. Carried through, never interpreted.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    pub fn is_leaf(&self) -> bool {
        self.taxon.is_some()
    }

    pub(crate) fn detach_child(&mut self, child: NodeId) {
        self.children.retain(|&c| c != child);
    }
}

/// Handle on the edge between `head` and its parent `tail`, valid for the
/// tree structure it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub head: NodeId,
    pub tail: NodeId,
    stamp: u64,
}

/// A rooted (or unrooted-by-convention) phylogenetic tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    namespace: Arc<TaxonNamespace>,
    rooted: bool,
    num_leaves: usize,
    stamp: u64,
    bipartitions: Option<Bipartitions>,
}

// ============================================================================
// Construction
// ============================================================================
impl Tree {
    /// Creates a tree made of a single internal root node.
    pub fn new(namespace: Arc<TaxonNamespace>) -> Self {
        Tree {
            nodes: vec![Node::internal(None)],
            root: 0,
            namespace,
            rooted: true,
            num_leaves: 0,
            stamp: next_stamp(),
            bipartitions: None,
        }
    }

    /// Creates a tree whose root is its only leaf.
    pub fn single_leaf(namespace: Arc<TaxonNamespace>, taxon: TaxonId) -> Result<Self> {
        if namespace.label(taxon).is_none() {
            return Err(TreeError::UnknownTaxon(taxon));
        }
        Ok(Tree {
            nodes: vec![Node::leaf(taxon, None)],
            root: 0,
            namespace,
            rooted: true,
            num_leaves: 1,
            stamp: next_stamp(),
            bipartitions: None,
        })
    }

    fn attach(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        if self.node(parent)?.is_leaf() {
            return Err(TreeError::LeafParent(parent));
        }
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        self.touch();
        Ok(id)
    }

    /// Appends a new internal node as the last child of `parent`.
    pub fn add_internal(&mut self, parent: NodeId, length: Option<f64>) -> Result<NodeId> {
        self.attach(parent, Node::internal(length))
    }

    /// Appends a new leaf for `taxon` as the last child of `parent`.
    pub fn add_leaf(&mut self, parent: NodeId, taxon: TaxonId, length: Option<f64>) -> Result<NodeId> {
        if self.namespace.label(taxon).is_none() {
            return Err(TreeError::UnknownTaxon(taxon));
        }
        let id = self.attach(parent, Node::leaf(taxon, length))?;
        self.num_leaves += 1;
        Ok(id)
    }

    /// Builds a new tree from the subtree of `slots` rooted at `root`,
    /// taking every visited node out of `slots`.
    ///
    /// `relabel` maps each leaf's taxon to the new namespace; leaves mapped to
    /// `None` are dropped. Internal nodes left without children are dropped
    /// and those left with a single child are suppressed, their edge length
    /// added onto the child's.
    pub(crate) fn assemble<F>(
        slots: &mut [Option<Node>],
        root: NodeId,
        namespace: Arc<TaxonNamespace>,
        rooted: bool,
        mut relabel: F,
    ) -> Result<Tree>
    where
        F: FnMut(TaxonId) -> Result<Option<TaxonId>>,
    {
        let order = slot_postorder(slots, root)?;
        let mut mapped: Vec<Option<NodeId>> = vec![None; slots.len()];
        let mut nodes: Vec<Node> = Vec::with_capacity(order.len());
        let mut num_leaves = 0;

        for old in order {
            let node = slots[old].take().ok_or(TreeError::NodeNotFound(old))?;

            if let Some(taxon) = node.taxon {
                if let Some(taxon) = relabel(taxon)? {
                    mapped[old] = Some(nodes.len());
                    nodes.push(Node::leaf(taxon, node.length));
                    num_leaves += 1;
                }
                continue;
            }

            let kids: Vec<NodeId> = node.children.iter().filter_map(|&c| mapped[c]).collect();
            match kids.len() {
                0 => {}
                1 => {
                    let only = kids[0];
                    nodes[only].length = join_lengths(nodes[only].length, node.length);
                    mapped[old] = Some(only);
                }
                _ => {
                    let id = nodes.len();
                    for &k in &kids {
                        nodes[k].parent = Some(id);
                    }
                    nodes.push(Node { parent: None, children: kids, taxon: None, length: node.length });
                    mapped[old] = Some(id);
                }
            }
        }

        let root = mapped[root].ok_or(TreeError::EmptyTree)?;
        Ok(Tree {
            nodes,
            root,
            namespace,
            rooted,
            num_leaves,
            stamp: next_stamp(),
            bipartitions: None,
        })
    }

    /// Hands the arena over as movable slots, consuming the tree.
    pub(crate) fn into_slots(self) -> (Vec<Option<Node>>, NodeId, Arc<TaxonNamespace>, bool) {
        let slots = self.nodes.into_iter().map(Some).collect();
        (slots, self.root, self.namespace, self.rooted)
    }

    /// Copy of this tree keeping only the leaves whose label is part of
    /// `namespace`, re-indexed into it. Unary nodes are suppressed.
    pub fn restricted_to(&self, namespace: Arc<TaxonNamespace>) -> Result<Tree> {
        let mut slots: Vec<Option<Node>> = self.nodes.iter().cloned().map(Some).collect();
        let target = Arc::clone(&namespace);
        Tree::assemble(&mut slots, self.root, namespace, self.rooted, |taxon| {
            let label = self
                .namespace
                .label(taxon)
                .ok_or(TreeError::UnknownTaxon(taxon))?;
            Ok(target.index_of(label))
        })
    }
}

/// Postorder over the nodes still present in `slots`, starting at `root`.
fn slot_postorder(slots: &[Option<Node>], root: NodeId) -> Result<Vec<NodeId>> {
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        let node = slots
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(TreeError::NodeNotFound(id))?;
        if expanded || node.children.is_empty() {
            order.push(id);
        } else {
            stack.push((id, true));
            stack.extend(node.children.iter().rev().map(|&c| (c, false)));
        }
    }
    Ok(order)
}

// ============================================================================
// Accessors and traversals
// ============================================================================
impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn namespace(&self) -> &Arc<TaxonNamespace> {
        &self.namespace
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    pub fn set_rooted(&mut self, rooted: bool) {
        self.rooted = rooted;
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Size of the node arena, detached nodes included.
    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Current structure stamp; changes with every structural mutation.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Nodes reachable from the root, children before parents, children
    /// visited in stored order.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            let node = &self.nodes[id];
            if expanded || node.children.is_empty() {
                order.push(id);
            } else {
                stack.push((id, true));
                stack.extend(node.children.iter().rev().map(|&c| (c, false)));
            }
        }
        order
    }

    /// Nodes reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Leaf nodes from left to right.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// Labels of the leaves from left to right.
    ///
    /// # Errors
    /// `TreeError::UnknownTaxon` if a leaf's taxon is missing from the namespace.
    pub fn leaf_labels(&self) -> Result<Vec<&str>> {
        self.leaves()
            .into_iter()
            .map(|id| self.taxon_label(id))
            .collect()
    }

    fn taxon_label(&self, id: NodeId) -> Result<&str> {
        let taxon = self.nodes[id].taxon.ok_or(TreeError::NodeNotFound(id))?;
        self.namespace
            .label(taxon)
            .ok_or(TreeError::UnknownTaxon(taxon))
    }

    /// Number of edges whose head is an internal node, root excluded.
    pub fn internal_edge_count(&self) -> usize {
        self.postorder()
            .into_iter()
            .filter(|&id| id != self.root && !self.nodes[id].is_leaf())
            .count()
    }

    /// Newick representation, edge lengths included when present.
    pub fn to_newick(&self) -> Result<String> {
        let mut out = String::new();
        self.write_newick(self.root, &mut out)?;
        out.push(';');
        Ok(out)
    }

    fn write_newick(&self, id: NodeId, out: &mut String) -> Result<()> {
        let node = &self.nodes[id];
        if node.is_leaf() {
            out.push_str(self.taxon_label(id)?);
        } else {
            out.push('(');
            for (i, &child) in node.children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                self.write_newick(child, out)?;
            }
            out.push(')');
        }
        if let Some(length) = node.length {
            out.push_str(&format!(":{length}"));
        }
        Ok(())
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

// ============================================================================
// Bipartitions and edges
// ============================================================================
impl Tree {
    /// Marks the structure as changed, invalidating bipartitions and edges.
    fn touch(&mut self) {
        self.stamp = next_stamp();
        self.bipartitions = None;
    }

    /// Leaf bitsets of the current structure.
    ///
    /// # Errors
    /// `TreeError::StaleBipartitions` if they were never computed or the tree
    /// changed since the last [`Tree::update_bipartitions`].
    pub fn bipartitions(&self) -> Result<&Bipartitions> {
        match &self.bipartitions {
            Some(b) if b.stamp() == self.stamp => Ok(b),
            _ => Err(TreeError::StaleBipartitions),
        }
    }

    /// Recomputes the leaf bitset of every edge from scratch.
    pub fn update_bipartitions(&mut self) -> Result<&Bipartitions> {
        let fresh = bipartition::refresh(self)?;
        let fresh = self.bipartitions.insert(fresh);
        Ok(&*fresh)
    }

    /// Refreshes the bipartitions only if they are stale.
    pub fn ensure_bipartitions(&mut self) -> Result<&Bipartitions> {
        if self.bipartitions().is_err() {
            return self.update_bipartitions();
        }
        self.bipartitions()
    }

    /// The edge above `head`.
    ///
    /// # Errors
    /// `TreeError::RootEdge` for the root, `TreeError::NodeNotFound` for an
    /// id outside the tree.
    pub fn edge(&self, head: NodeId) -> Result<Edge> {
        let tail = self
            .node(head)?
            .parent
            .ok_or(TreeError::RootEdge(head))?;
        Ok(Edge { head, tail, stamp: self.stamp })
    }

    /// Checks that `edge` was taken from this tree in its current shape.
    pub fn check_edge(&self, edge: &Edge) -> Result<()> {
        let linked = self
            .nodes
            .get(edge.head)
            .is_some_and(|n| n.parent == Some(edge.tail));
        if edge.stamp != self.stamp || !linked {
            return Err(TreeError::StaleEdge { head: edge.head, tail: edge.tail });
        }
        Ok(())
    }

    /// Cuts the tree at `edge`, see [`crate::split::bipartition_by_edge`].
    pub fn split(self, edge: Edge) -> Result<(Tree, Tree)> {
        crate::split::bipartition_by_edge(self, edge)
    }
}

// ============================================================================
// Normalizations applied after loading
// ============================================================================
impl Tree {
    /// Removes internal nodes with a single child (joining the two edges) and
    /// internal nodes without children.
    pub fn suppress_unifurcations(&mut self) {
        let mut changed = false;
        for id in self.postorder() {
            let node = &self.nodes[id];
            if node.is_leaf() || node.children.len() > 1 {
                continue;
            }
            let parent = node.parent;
            match (node.children.first().copied(), parent) {
                (None, Some(p)) => {
                    self.nodes[p].children.retain(|&c| c != id);
                }
                (None, None) => {}
                (Some(child), Some(p)) => {
                    let length = self.nodes[id].length;
                    if let Some(slot) = self.nodes[p].children.iter_mut().find(|c| **c == id) {
                        *slot = child;
                    }
                    let child_node = &mut self.nodes[child];
                    child_node.parent = Some(p);
                    child_node.length = join_lengths(child_node.length, length);
                }
                (Some(child), None) => {
                    self.nodes[child].parent = None;
                    self.root = child;
                }
            }
            let orphan = &mut self.nodes[id];
            orphan.parent = None;
            orphan.children.clear();
            changed = true;
        }
        if changed {
            self.touch();
        }
    }

    /// Splits every node with more than `limit` children into a left comb,
    /// so that afterwards no node has more than `limit` children. Children
    /// keep their relative order.
    ///
    /// # Errors
    /// `TreeError::InvalidArgument` if `limit < 2`.
    pub fn resolve_polytomies(&mut self, limit: usize) -> Result<()> {
        if limit < 2 {
            return Err(TreeError::InvalidArgument("polytomy limit must be at least 2"));
        }
        let polytomies: Vec<NodeId> = self
            .postorder()
            .into_iter()
            .filter(|&id| self.nodes[id].children.len() > limit)
            .collect();
        if polytomies.is_empty() {
            return Ok(());
        }

        for mut id in polytomies {
            while self.nodes[id].children.len() > limit {
                let moved = self.nodes[id].children.split_off(limit - 1);
                let joint = self.nodes.len();
                for &c in &moved {
                    self.nodes[c].parent = Some(joint);
                }
                self.nodes.push(Node { parent: Some(id), children: moved, taxon: None, length: None });
                self.nodes[id].children.push(joint);
                id = joint;
            }
        }
        self.touch();
        Ok(())
    }

    /// If the root has exactly two children, dissolves one internal child
    /// into the root: the second child when it is internal, else the first.
    /// Its children are appended after the kept child and its edge length
    /// moves to the kept child, keeping path lengths through the root.
    pub fn collapse_basal_bifurcation(&mut self) {
        let root = self.root;
        let &[first, second] = self.nodes[root].children.as_slice() else {
            return;
        };
        let (collapsed, kept) = if !self.nodes[second].is_leaf() {
            (second, first)
        } else if !self.nodes[first].is_leaf() {
            (first, second)
        } else {
            return;
        };

        let grandchildren = std::mem::take(&mut self.nodes[collapsed].children);
        for &g in &grandchildren {
            self.nodes[g].parent = Some(root);
        }
        let length = self.nodes[collapsed].length.take();
        self.nodes[kept].length = join_lengths(self.nodes[kept].length, length);
        self.nodes[collapsed].parent = None;
        let children = &mut self.nodes[root].children;
        children.clear();
        children.push(kept);
        children.extend(grandchildren);
        self.touch();
    }
}
