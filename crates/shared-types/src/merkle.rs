//! Merkle summary of a set of leaf hashes.
//!
//! Used to compare peer lists between nodes without transferring them: two
//! nodes with the same root hold the same peers.

use serde::{Deserialize, Serialize};

use crate::digest::sha256_hex;

/// Summary of a merkle tree built over uppercase hex leaf hashes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MerkleSummary {
    pub depth: u32,
    #[serde(rename = "nodesCount")]
    pub nodes_count: u32,
    #[serde(rename = "leavesCount")]
    pub leaves_count: u32,
    pub root: String,
    /// Sorted leaves. Only filled when explicitly requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leaves: Vec<String>,
}

impl MerkleSummary {
    /// Build the summary of `leaves`. Duplicates are ignored and order does
    /// not matter.
    ///
    /// Each level hashes the concatenation of adjacent pairs; an odd node is
    /// carried up unchanged.
    #[must_use]
    pub fn from_leaves<I, S>(leaves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut leaves: Vec<String> = leaves.into_iter().map(Into::into).collect();
        leaves.sort();
        leaves.dedup();

        if leaves.is_empty() {
            return Self::default();
        }

        let mut depth = 0u32;
        let mut nodes_count = leaves.len() as u32;
        let mut level = leaves.clone();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => sha256_hex(format!("{left}{right}").as_bytes()),
                    odd => odd.concat(),
                })
                .collect();
            nodes_count += level.len() as u32;
            depth += 1;
        }

        Self {
            depth,
            nodes_count,
            leaves_count: leaves.len() as u32,
            root: level.into_iter().next().unwrap_or_default(),
            leaves,
        }
    }

    /// Same summary without the leaf list.
    #[must_use]
    pub fn without_leaves(mut self) -> Self {
        self.leaves.clear();
        self
    }

    #[must_use]
    pub fn contains(&self, leaf: &str) -> bool {
        self.leaves.binary_search_by(|l| l.as_str().cmp(leaf)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree() {
        let summary = MerkleSummary::from_leaves(Vec::<String>::new());
        assert_eq!(summary.root, "");
        assert_eq!(summary.leaves_count, 0);
        assert_eq!(summary.depth, 0);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let summary = MerkleSummary::from_leaves(["AA"]);
        assert_eq!(summary.root, "AA");
        assert_eq!(summary.nodes_count, 1);
    }

    #[test]
    fn test_order_and_duplicates_do_not_matter() {
        let a = MerkleSummary::from_leaves(["CC", "AA", "BB"]);
        let b = MerkleSummary::from_leaves(["BB", "CC", "AA", "BB"]);
        assert_eq!(a, b);
        assert_eq!(a.leaves, vec!["AA", "BB", "CC"]);
        assert_eq!(a.depth, 2);
        // 3 leaves, 2 nodes, 1 root
        assert_eq!(a.nodes_count, 6);
        assert!(a.contains("BB"));
        assert!(!a.contains("DD"));
    }

    #[test]
    fn test_two_leaves_root() {
        let summary = MerkleSummary::from_leaves(["AA", "BB"]);
        assert_eq!(summary.root, sha256_hex(b"AABB"));
    }

    #[test]
    fn test_without_leaves_skips_field() {
        let summary = MerkleSummary::from_leaves(["AA", "BB"]).without_leaves();
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("leaves").is_none());
        assert_eq!(value["leavesCount"], 2);
    }
}
