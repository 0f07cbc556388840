//! Compact bitset representation for leaf sets in phylogenetic trees.
//!
//! # Overview
//! Every edge of a tree owns one bitset: the leaves found below the edge's
//! head node. Bit positions are taxon indices of the tree's namespace, so all
//! trees sharing a namespace (for instance the pieces of a decomposition) use
//! the same index space.
//!
//! # Example
//! For a namespace [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Leaf set {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Leaf set {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A compact bitset for representing which leaves sit below an edge.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily large trees.
/// Each u64 word holds 64 leaf indices.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Calculate as `num_taxa.div_ceil(64)`
    ///
    /// # Example
    /// ```
    /// # use rust_python_tree_decomposition::bitset::Bitset;
    /// // For a namespace with 100 taxa, need 2 words (128 bits)
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use rust_python_tree_decomposition::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0[word] |= 1u64 << bit;
    }

    /// Whether the bit at `idx` is set. Out of range indices are never set.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|w| w & (1u64 << (idx & 63)) != 0)
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use rust_python_tree_decomposition::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    ///
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Returns `self \ other`, the bits set here but not in `other`.
    ///
    /// Used to take the complement of an edge's leaf set relative to the
    /// whole tree rather than the whole namespace.
    ///
    /// # Example
    /// ```
    /// # use rust_python_tree_decomposition::bitset::Bitset;
    /// let mut all = Bitset::zeros(1);
    /// (0..4).for_each(|i| all.set(i));
    /// let mut below = Bitset::zeros(1);
    /// below.set(1);
    /// assert_eq!(all.difference(&below).0[0], 0b1101);
    /// ```
    pub fn difference(&self, other: &Bitset) -> Bitset {
        Bitset(
            self.0
                .iter()
                .zip(other.0.iter().chain(std::iter::repeat(&0)))
                .map(|(a, b)| a & !b)
                .collect(),
        )
    }

    /// Whether the two sets share no bit.
    pub fn is_disjoint(&self, other: &Bitset) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| a & b == 0)
    }

    /// Index of the lowest set bit, if any.
    pub fn first_one(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| (i << 6) + w.trailing_zeros() as usize)
    }

    /// Iterates the indices of all set bits in increasing order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some((i << 6) + bit)
            })
        })
    }

    /// Counts the number of set bits (population count).
    ///
    /// # Example
    /// ```
    /// # use rust_python_tree_decomposition::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(2);
    /// bs.set(5);
    /// assert_eq!(bs.count_ones(), 3);
    /// ```
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}
