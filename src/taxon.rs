//! Taxon namespace: the shared leaf index space of a group of trees.
//!
//! Leaves never store their label directly, they store a [`TaxonId`] into a
//! [`TaxonNamespace`]. The namespace is built once and then shared read-only
//! (behind an `Arc`) by every tree that uses it, including all pieces of a
//! decomposition, so leaf bitsets of different trees are directly comparable.

use std::collections::HashMap;

use crate::error::{Result, TreeError};

/// Index of a taxon in its namespace, and bit position in leaf bitsets.
pub type TaxonId = usize;

/// Ordered, deduplicated set of taxon labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonNamespace {
    labels: Vec<String>,
    index: HashMap<String, TaxonId>,
}

impl TaxonNamespace {
    /// Builds a namespace assigning indices in iteration order.
    ///
    /// # Errors
    /// Returns `TreeError::DuplicateTaxon` if a label occurs twice.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut namespace = TaxonNamespace::default();
        for label in labels {
            let label = label.into();
            if namespace.index.contains_key(&label) {
                return Err(TreeError::DuplicateTaxon(label));
            }
            namespace.index.insert(label.clone(), namespace.labels.len());
            namespace.labels.push(label);
        }
        Ok(namespace)
    }

    /// Builds a namespace from labels sorted alphabetically, so identical
    /// label sets always map to identical indices whatever the input order.
    pub fn sorted<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort_unstable();
        Self::from_labels(labels)
    }

    pub fn index_of(&self, label: &str) -> Option<TaxonId> {
        self.index.get(label).copied()
    }

    pub fn label(&self, taxon: TaxonId) -> Option<&str> {
        self.labels.get(taxon).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of u64 words in a leaf bitset over this namespace.
    pub fn words(&self) -> usize {
        self.labels.len().div_ceil(64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_namespace_is_order_independent() {
        let a = TaxonNamespace::sorted(["Human", "Chimp", "Gorilla"]).unwrap();
        let b = TaxonNamespace::sorted(["Gorilla", "Human", "Chimp"]).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.index_of("Chimp"), Some(0));
        assert_eq!(a.index_of("Gorilla"), Some(1));
        assert_eq!(a.label(2), Some("Human"));
        assert_eq!(a.label(3), None);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = TaxonNamespace::from_labels(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateTaxon(l) if l == "A"));
    }

    #[test]
    fn test_words() {
        let labels: Vec<String> = (0..65).map(|i| format!("t{i}")).collect();
        assert_eq!(TaxonNamespace::from_labels(labels).unwrap().words(), 2);
        assert_eq!(TaxonNamespace::default().words(), 1);
    }
}
