//! The subnet partition tree.
//!
//! A [`SubnetTree`] partitions one root CIDR block into leaves by repeated
//! halving. Every node is either a leaf (one visible subnet row, optionally
//! annotated) or a split into two equal halves. The leaves always form an
//! exact, non-overlapping cover of the root's address range; split and join
//! cannot break that invariant.

use itertools::Itertools;
use std::error::Error;

use super::{Ipv4, OperatingMode};

/// One node of the partition tree.
///
/// The two children of a [`SubnetNode::Split`] are an ordered pair: `low`
/// covers the lower half of the parent block and `high` the upper half.
/// Their CIDRs are derived from the parent, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnetNode {
    /// An undivided block, displayed as a table row.
    Leaf {
        note: Option<String>,
        color: Option<String>,
    },
    /// A block divided into two equal halves.
    Split {
        low: Box<SubnetNode>,
        high: Box<SubnetNode>,
    },
}

impl SubnetNode {
    /// A fresh unannotated leaf.
    pub fn leaf() -> SubnetNode {
        SubnetNode::Leaf {
            note: None,
            color: None,
        }
    }

    /// True if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, SubnetNode::Leaf { .. })
    }
}

/// A leaf of the tree together with its absolute CIDR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRow {
    pub subnet: Ipv4,
    pub note: Option<String>,
    pub color: Option<String>,
}

/// Hierarchical partition of one root network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetTree {
    pub(crate) root: Ipv4,
    pub(crate) node: SubnetNode,
}

impl SubnetTree {
    /// Create a tree consisting of a single root leaf.
    ///
    /// The network address is normalized down to its block boundary first,
    /// so `10.0.0.77/16` becomes a tree rooted at `10.0.0.0/16`.
    pub fn new(network: &str, mask: u8) -> Result<SubnetTree, Box<dyn Error>> {
        let addr = network
            .trim()
            .parse()
            .map_err(|_| format!("Invalid address {network}"))?;
        let root = Ipv4::from_parts(addr, mask)?;
        Ok(SubnetTree {
            root,
            node: SubnetNode::leaf(),
        })
    }

    /// Build a tree from an already-assembled node structure.
    pub(crate) fn from_node(root: Ipv4, node: SubnetNode) -> SubnetTree {
        SubnetTree { root, node }
    }

    /// The root CIDR this tree partitions.
    pub fn root(&self) -> Ipv4 {
        self.root
    }

    /// The root node, for structural consumers (the config codec).
    pub(crate) fn node(&self) -> &SubnetNode {
        &self.node
    }

    /// Split a leaf into its two halves.
    ///
    /// The leaf's note and color are cloned onto both children, the most
    /// useful default when subdividing an annotated block. Fails without
    /// mutating if `target` is not a current leaf or if the children would
    /// be smaller than the mode minimum.
    pub fn split(&mut self, target: Ipv4, mode: OperatingMode) -> Result<(), Box<dyn Error>> {
        let min = mode.min_subnet_size();
        let node = self
            .find_node_mut(target)
            .ok_or_else(|| format!("{target} is not a subnet in this tree"))?;
        match node {
            SubnetNode::Split { .. } => Err(format!("{target} is already split").into()),
            SubnetNode::Leaf { .. } if target.mask >= min => Err(format!(
                "The minimum IPv4 subnet size for {mode} mode is /{min}, cannot split {target}"
            )
            .into()),
            SubnetNode::Leaf { note, color } => {
                let note = note.take();
                let color = color.take();
                log::debug!("split {target}");
                *node = SubnetNode::Split {
                    low: Box::new(SubnetNode::Leaf {
                        note: note.clone(),
                        color: color.clone(),
                    }),
                    high: Box::new(SubnetNode::Leaf { note, color }),
                };
                Ok(())
            }
        }
    }

    /// Collapse the subtree at `target` back into a single leaf.
    ///
    /// A note survives the join only when every descendant leaf agrees on
    /// it; otherwise it is dropped rather than guessed. Same for color.
    pub fn join(&mut self, target: Ipv4) -> Result<(), Box<dyn Error>> {
        let node = self
            .find_node_mut(target)
            .ok_or_else(|| format!("{target} is not a subnet in this tree"))?;
        match node {
            SubnetNode::Leaf { .. } => {
                Err(format!("{target} is not split, there is nothing to join").into())
            }
            SubnetNode::Split { .. } => {
                let mut meta = Vec::new();
                collect_leaf_meta(node, &mut meta);
                let note = consolidate(meta.iter().map(|(n, _)| *n));
                let color = consolidate(meta.iter().map(|(_, c)| *c));
                log::debug!("join {target} ({} leaves)", meta.len());
                *node = SubnetNode::Leaf { note, color };
                Ok(())
            }
        }
    }

    /// Set the note on a leaf. An empty value clears the note.
    pub fn set_note(&mut self, target: Ipv4, value: &str) -> Result<(), Box<dyn Error>> {
        self.set_leaf_meta(target, |note, _| *note = non_empty(value))
    }

    /// Set the color on a leaf. An empty value clears the color.
    pub fn set_color(&mut self, target: Ipv4, value: &str) -> Result<(), Box<dyn Error>> {
        self.set_leaf_meta(target, |_, color| *color = non_empty(value))
    }

    fn set_leaf_meta(
        &mut self,
        target: Ipv4,
        set: impl FnOnce(&mut Option<String>, &mut Option<String>),
    ) -> Result<(), Box<dyn Error>> {
        let node = self
            .find_node_mut(target)
            .ok_or_else(|| format!("{target} is not a subnet in this tree"))?;
        match node {
            SubnetNode::Leaf { note, color } => {
                set(note, color);
                Ok(())
            }
            SubnetNode::Split { .. } => {
                Err(format!("{target} is split and cannot carry a note or color").into())
            }
        }
    }

    /// Move the whole tree to a new root of the same prefix length.
    ///
    /// Children are positions relative to their parent, so shifting the
    /// root base carries every subnet along at the same relative offset.
    pub fn rebase(&mut self, new_root: Ipv4) -> Result<(), Box<dyn Error>> {
        if new_root.mask != self.root.mask {
            return Err(format!(
                "Cannot rebase a /{} tree onto {new_root}, sizes differ",
                self.root.mask
            )
            .into());
        }
        log::info!("rebase {} -> {}", self.root, new_root);
        self.root = new_root;
        Ok(())
    }

    /// All leaves in ascending address order.
    pub fn leaves(&self) -> Vec<LeafRow> {
        let mut out = Vec::new();
        collect_leaves(&self.node, self.root, &mut out);
        out
    }

    /// Maximum nesting depth of split nodes (an unsplit tree has depth 0).
    pub fn depth(&self) -> usize {
        node_depth(&self.node)
    }

    /// True if `target` currently exists as a leaf.
    pub fn contains_leaf(&self, target: Ipv4) -> bool {
        matches!(self.find_node(target), Some(SubnetNode::Leaf { .. }))
    }

    /// The CIDR of the leaf whose range covers `target`, if the path to
    /// `target` ends in a leaf at or above it.
    pub fn leaf_covering(&self, target: Ipv4) -> Option<Ipv4> {
        if !self.root.contains_block(&target) {
            return None;
        }
        let mut cur = self.root;
        let mut node = &self.node;
        loop {
            match node {
                SubnetNode::Leaf { .. } => return Some(cur),
                SubnetNode::Split { low, high } => {
                    if cur.mask == target.mask {
                        // target itself is split
                        return None;
                    }
                    let (l, h) = halves_of(cur);
                    if l.contains(target.addr) {
                        cur = l;
                        node = &**low;
                    } else {
                        cur = h;
                        node = &**high;
                    }
                }
            }
        }
    }

    /// True if every leaf satisfies the mode's minimum subnet size.
    pub fn validate_min_size(&self, mode: OperatingMode) -> bool {
        self.leaves()
            .iter()
            .all(|l| l.subnet.mask <= mode.min_subnet_size())
    }

    fn find_node(&self, target: Ipv4) -> Option<&SubnetNode> {
        if !self.root.contains_block(&target) {
            return None;
        }
        let mut cur = self.root;
        let mut node = &self.node;
        while cur.mask < target.mask {
            match node {
                SubnetNode::Leaf { .. } => return None,
                SubnetNode::Split { low, high } => {
                    let (l, h) = halves_of(cur);
                    if l.contains(target.addr) {
                        cur = l;
                        node = &**low;
                    } else {
                        cur = h;
                        node = &**high;
                    }
                }
            }
        }
        Some(node)
    }

    fn find_node_mut(&mut self, target: Ipv4) -> Option<&mut SubnetNode> {
        if !self.root.contains_block(&target) {
            return None;
        }
        let mut cur = self.root;
        let mut node = &mut self.node;
        while cur.mask < target.mask {
            match node {
                SubnetNode::Leaf { .. } => return None,
                SubnetNode::Split { low, high } => {
                    let (l, h) = halves_of(cur);
                    if l.contains(target.addr) {
                        cur = l;
                        node = &mut **low;
                    } else {
                        cur = h;
                        node = &mut **high;
                    }
                }
            }
        }
        Some(node)
    }
}

fn halves_of(cidr: Ipv4) -> (Ipv4, Ipv4) {
    cidr.halves()
        .unwrap_or_else(|e| panic!("split node at {cidr} has no room for children: {e}"))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn collect_leaves(node: &SubnetNode, cidr: Ipv4, out: &mut Vec<LeafRow>) {
    match node {
        SubnetNode::Leaf { note, color } => out.push(LeafRow {
            subnet: cidr,
            note: note.clone(),
            color: color.clone(),
        }),
        SubnetNode::Split { low, high } => {
            let (l, h) = halves_of(cidr);
            collect_leaves(low, l, out);
            collect_leaves(high, h, out);
        }
    }
}

fn collect_leaf_meta<'a>(node: &'a SubnetNode, out: &mut Vec<(&'a str, &'a str)>) {
    match node {
        SubnetNode::Leaf { note, color } => out.push((
            note.as_deref().unwrap_or(""),
            color.as_deref().unwrap_or(""),
        )),
        SubnetNode::Split { low, high } => {
            collect_leaf_meta(low, out);
            collect_leaf_meta(high, out);
        }
    }
}

fn consolidate<'a>(mut values: impl Iterator<Item = &'a str> + Clone) -> Option<String> {
    if values.clone().all_equal() {
        values.next().and_then(|v| non_empty(v))
    } else {
        None
    }
}

fn node_depth(node: &SubnetNode) -> usize {
    match node {
        SubnetNode::Leaf { .. } => 0,
        SubnetNode::Split { low, high } => 1 + node_depth(low).max(node_depth(high)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4 {
        Ipv4::new(s).unwrap()
    }

    /// Leaves must exactly cover the root with no overlap.
    fn assert_partition(tree: &SubnetTree) {
        let leaves = tree.leaves();
        let total: u64 = leaves.iter().map(|l| l.subnet.size()).sum();
        assert_eq!(total, tree.root().size(), "leaves must cover the root");
        for (a, b) in leaves.iter().zip(leaves.iter().skip(1)) {
            assert!(
                u64::from(u32::from(a.subnet.last())) < u64::from(b.subnet.base()),
                "{} overlaps or is out of order with {}",
                a.subnet,
                b.subnet
            );
        }
    }

    #[test]
    fn test_new_normalizes_root() {
        let tree = SubnetTree::new("10.0.0.77", 16).unwrap();
        assert_eq!(tree.root().to_string(), "10.0.0.0/16");
        assert_eq!(tree.leaves().len(), 1);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_split_and_leaf_order() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        tree.split(cidr("10.0.0.0/16"), OperatingMode::Standard)
            .unwrap();
        tree.split(cidr("10.0.128.0/17"), OperatingMode::Standard)
            .unwrap();

        let leaves: Vec<String> = tree.leaves().iter().map(|l| l.subnet.to_string()).collect();
        assert_eq!(leaves, ["10.0.0.0/17", "10.0.128.0/18", "10.0.192.0/18"]);
        assert_eq!(tree.depth(), 2);
        assert_partition(&tree);
    }

    #[test]
    fn test_split_clones_note_and_color() {
        let mut tree = SubnetTree::new("10.0.0.0", 24).unwrap();
        tree.set_note(cidr("10.0.0.0/24"), "app tier").unwrap();
        tree.set_color(cidr("10.0.0.0/24"), "#ff000044").unwrap();
        tree.split(cidr("10.0.0.0/24"), OperatingMode::Standard)
            .unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 2);
        for leaf in &leaves {
            assert_eq!(leaf.note.as_deref(), Some("app tier"));
            assert_eq!(leaf.color.as_deref(), Some("#ff000044"));
        }
    }

    #[test]
    fn test_join_restores_original_leaf() {
        let mut tree = SubnetTree::new("192.168.0.0", 24).unwrap();
        tree.set_note(cidr("192.168.0.0/24"), "lan").unwrap();
        tree.split(cidr("192.168.0.0/24"), OperatingMode::Standard)
            .unwrap();
        tree.join(cidr("192.168.0.0/24")).unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].subnet, cidr("192.168.0.0/24"));
        assert_eq!(leaves[0].note.as_deref(), Some("lan"));
        assert_partition(&tree);
    }

    #[test]
    fn test_join_drops_disagreeing_notes() {
        let mut tree = SubnetTree::new("192.168.0.0", 24).unwrap();
        tree.split(cidr("192.168.0.0/24"), OperatingMode::Standard)
            .unwrap();
        tree.set_note(cidr("192.168.0.0/25"), "left").unwrap();
        tree.set_note(cidr("192.168.0.128/25"), "right").unwrap();
        tree.set_color(cidr("192.168.0.0/25"), "#00ff00").unwrap();
        tree.set_color(cidr("192.168.0.128/25"), "#00ff00").unwrap();
        tree.join(cidr("192.168.0.0/24")).unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves[0].note, None, "differing notes are dropped");
        assert_eq!(
            leaves[0].color.as_deref(),
            Some("#00ff00"),
            "agreeing colors survive"
        );
    }

    #[test]
    fn test_join_requires_split_node() {
        let mut tree = SubnetTree::new("10.0.0.0", 24).unwrap();
        let before = tree.clone();
        assert!(tree.join(cidr("10.0.0.0/24")).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_split_minimum_size_aws() {
        let mut tree = SubnetTree::new("10.0.0.0", 28).unwrap();
        let before = tree.clone();
        let err = tree
            .split(cidr("10.0.0.0/28"), OperatingMode::Aws)
            .unwrap_err();
        assert!(err.to_string().contains("/28"), "unexpected error: {err}");
        assert_eq!(tree, before, "failed split must not mutate");

        // The same split is fine in Standard mode.
        tree.split(cidr("10.0.0.0/28"), OperatingMode::Standard)
            .unwrap();
        assert_eq!(tree.leaves().len(), 2);
    }

    #[test]
    fn test_split_minimum_size_per_mode() {
        for (mode, ok_mask, bad_mask) in [
            (OperatingMode::Standard, 31, 32),
            (OperatingMode::Aws, 27, 28),
            (OperatingMode::Azure, 28, 29),
            (OperatingMode::Oci, 29, 30),
        ] {
            let mut tree = SubnetTree::new("10.0.0.0", ok_mask).unwrap();
            tree.split(Ipv4::from_parts("10.0.0.0".parse().unwrap(), ok_mask).unwrap(), mode)
                .unwrap();

            let mut tree = SubnetTree::new("10.0.0.0", bad_mask).unwrap();
            assert!(tree
                .split(
                    Ipv4::from_parts("10.0.0.0".parse().unwrap(), bad_mask).unwrap(),
                    mode
                )
                .is_err());
        }
    }

    #[test]
    fn test_split_unknown_target() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        // Not inside the root at all.
        assert!(tree
            .split(cidr("172.16.0.0/24"), OperatingMode::Standard)
            .is_err());
        // Inside the root but below an unsplit leaf.
        assert!(tree
            .split(cidr("10.0.3.0/24"), OperatingMode::Standard)
            .is_err());
    }

    #[test]
    fn test_set_note_on_split_node_fails() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        tree.split(cidr("10.0.0.0/16"), OperatingMode::Standard)
            .unwrap();
        assert!(tree.set_note(cidr("10.0.0.0/16"), "nope").is_err());
        assert!(tree.set_note(cidr("10.0.0.0/17"), "fine").is_ok());
    }

    #[test]
    fn test_rebase_shifts_all_leaves() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        tree.split(cidr("10.0.0.0/16"), OperatingMode::Standard)
            .unwrap();
        tree.split(cidr("10.0.0.0/17"), OperatingMode::Standard)
            .unwrap();
        tree.set_note(cidr("10.0.64.0/18"), "kept").unwrap();

        tree.rebase(cidr("10.100.0.0/16")).unwrap();
        let leaves: Vec<String> = tree.leaves().iter().map(|l| l.subnet.to_string()).collect();
        assert_eq!(
            leaves,
            ["10.100.0.0/18", "10.100.64.0/18", "10.100.128.0/17"]
        );
        assert_eq!(tree.leaves()[1].note.as_deref(), Some("kept"));
        assert_partition(&tree);
    }

    #[test]
    fn test_rebase_size_mismatch() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        assert!(tree.rebase(cidr("10.100.0.0/17")).is_err());
    }

    #[test]
    fn test_leaf_covering() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        tree.split(cidr("10.0.0.0/16"), OperatingMode::Standard)
            .unwrap();
        assert_eq!(
            tree.leaf_covering(cidr("10.0.32.0/20")),
            Some(cidr("10.0.0.0/17"))
        );
        assert_eq!(
            tree.leaf_covering(cidr("10.0.128.0/17")),
            Some(cidr("10.0.128.0/17"))
        );
        assert_eq!(tree.leaf_covering(cidr("11.0.0.0/24")), None);
    }

    #[test]
    fn test_partition_invariant_random_mutations() {
        // Deterministic pseudo-random split/join sequence; the leaves must
        // remain an exact cover of the root after every operation.
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        let mut state: u64 = 0x2545F4914F6CDD1D;
        for _ in 0..300 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let leaves = tree.leaves();
            let pick = leaves[(state >> 33) as usize % leaves.len()].subnet;
            if state & 1 == 0 {
                let _ = tree.split(pick, OperatingMode::Standard);
            } else if pick.mask > 16 {
                // Join the parent of the picked leaf.
                let parent = Ipv4::from_parts(pick.addr, pick.mask - 1).unwrap();
                let _ = tree.join(parent);
            }
            assert_partition(&tree);
        }
    }
}
