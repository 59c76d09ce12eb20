//! Sorted reference index
//!
//! Maps every addressable target reference to the child-index path of its
//! node. Entries are kept sorted by reference (byte-wise lexicographic, the
//! order the generator emits) so lookups are a binary search.

use super::{ChildSource, DataError, NavError, NodeData};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Child indices from the root down to a node
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub reference: String,
    pub node_path: NodePath,
}

impl IndexEntry {
    pub fn new(reference: impl Into<String>, node_path: NodePath) -> Self {
        Self {
            reference: reference.into(),
            node_path,
        }
    }
}

/// Result of a binary search, with the number of comparisons it took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `Ok(i)` on an exact match, `Err(i)` with the insertion point otherwise
    pub position: Result<usize, usize>,
    pub comparisons: u32,
}

/// Static, sorted index of references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavIndex {
    entries: Vec<IndexEntry>,
}

impl NavIndex {
    /// Build an index from entries that must already be strictly sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsortedIndex`] at the first entry that is not
    /// strictly greater than its predecessor.
    pub fn new(entries: Vec<IndexEntry>) -> Result<Self, DataError> {
        for (i, pair) in entries.windows(2).enumerate() {
            if pair[0].reference >= pair[1].reference {
                return Err(DataError::UnsortedIndex {
                    position: i + 1,
                    reference: pair[1].reference.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Build an index from arbitrary entries, sorting them and keeping the
    /// first entry for any duplicated reference.
    pub fn from_unsorted(mut entries: Vec<IndexEntry>) -> Self {
        // stable sort keeps the first occurrence ahead of later duplicates
        entries.sort_by(|a, b| a.reference.cmp(&b.reference));
        entries.dedup_by(|later, earlier| later.reference == earlier.reference);
        Self { entries }
    }

    /// Build an index from a generated chunk table (`reference -> path`).
    pub fn from_table(table: BTreeMap<String, NodePath>) -> Self {
        let entries = table
            .into_iter()
            .map(|(reference, node_path)| IndexEntry {
                reference,
                node_path,
            })
            .collect();
        // BTreeMap<String, _> iterates in byte-wise order without duplicates
        Self { entries }
    }

    /// Derive an index from the eagerly known part of a tree.
    ///
    /// Nodes are visited in pre-order so the shallowest, first-listed node
    /// wins when several nodes share a target. Lazy sub-trees are not
    /// visited.
    pub fn from_tree(root: &NodeData) -> Self {
        let mut entries = Vec::new();
        let mut path = Vec::new();
        collect_entries(root, &mut path, &mut entries);
        Self::from_unsorted(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// First reference in collation order
    pub fn first_reference(&self) -> Option<&str> {
        self.entries.first().map(|e| e.reference.as_str())
    }

    /// Binary search for `reference`, counting comparisons.
    ///
    /// Performs at most `floor(log2(n)) + 1` comparisons.
    pub fn search(&self, reference: &str) -> SearchOutcome {
        let mut low = 0;
        let mut high = self.entries.len();
        let mut comparisons = 0;

        while low < high {
            let mid = low + (high - low) / 2;
            comparisons += 1;
            match self.entries[mid].reference.as_str().cmp(reference) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => {
                    return SearchOutcome {
                        position: Ok(mid),
                        comparisons,
                    }
                }
            }
        }

        SearchOutcome {
            position: Err(low),
            comparisons,
        }
    }

    pub fn find(&self, reference: &str) -> Option<&IndexEntry> {
        match self.search(reference).position {
            Ok(i) => Some(&self.entries[i]),
            Err(_) => None,
        }
    }
}

fn collect_entries(node: &NodeData, path: &mut Vec<usize>, out: &mut Vec<IndexEntry>) {
    if let Some(target) = &node.target {
        out.push(IndexEntry::new(target.clone(), path.clone()));
    }
    if let ChildSource::Eager(children) = &node.children {
        for (i, child) in children.iter().enumerate() {
            path.push(i);
            collect_entries(child, path, out);
            path.pop();
        }
    }
}

/// Lookup seam used by the sync controller
///
/// Implemented by the in-memory [`NavIndex`] and by the chunked index that
/// loads its tables on demand.
#[async_trait]
pub trait ReferenceIndex: Send + Sync {
    /// Resolve `reference` to its node path.
    ///
    /// # Errors
    ///
    /// [`NavError::NotFound`] when the reference is not indexed;
    /// [`NavError::ResourceUnavailable`] when index data could not be loaded.
    async fn lookup(&self, reference: &str) -> Result<NodePath, NavError>;
}

#[async_trait]
impl ReferenceIndex for NavIndex {
    async fn lookup(&self, reference: &str) -> Result<NodePath, NavError> {
        self.find(reference)
            .map(|entry| entry.node_path.clone())
            .ok_or_else(|| NavError::NotFound {
                reference: reference.to_string(),
            })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn references() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z_#.]{1,12}", 0..200)
    }

    fn build(refs: &[String]) -> NavIndex {
        NavIndex::from_unsorted(
            refs.iter()
                .enumerate()
                .map(|(i, r)| IndexEntry::new(r.clone(), vec![i]))
                .collect(),
        )
    }

    fn max_comparisons(n: usize) -> u32 {
        // floor(log2(n)) + 1
        usize::BITS - n.leading_zeros()
    }

    proptest! {
        /// Every indexed reference is found, within the logarithmic bound
        #[test]
        fn present_references_are_found(refs in references()) {
            let index = build(&refs);
            for reference in &refs {
                let outcome = index.search(reference);
                prop_assert!(outcome.position.is_ok());
                prop_assert!(outcome.comparisons <= max_comparisons(index.len()));
            }
        }

        /// Absent references terminate within the same bound with an insertion point
        #[test]
        fn absent_references_are_not_found(refs in references(), probe in "[A-Z]{1,8}") {
            let index = build(&refs);
            let outcome = index.search(&probe);
            prop_assert!(outcome.position.is_err());
            prop_assert!(outcome.comparisons <= max_comparisons(index.len()));
        }

        /// The first listed entry for a reference wins
        #[test]
        fn first_duplicate_wins(refs in references()) {
            let index = build(&refs);
            for entry in index.entries() {
                let first = refs.iter().position(|r| *r == entry.reference).unwrap();
                prop_assert_eq!(&entry.node_path, &vec![first]);
            }
            prop_assert!(NavIndex::new(index.entries().to_vec()).is_ok());
        }
    }
}
