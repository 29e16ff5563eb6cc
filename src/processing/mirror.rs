//! Blue/green mirror planning.
//!
//! Shifts every leaf of an existing tree onto a second base network of the
//! same size, producing a labelled allocation list that can be reviewed or
//! fed back through the allocator to build the mirror side.

use std::error::Error;
use std::net::Ipv4Addr;

use crate::models::{is_block_aligned, Ipv4, SubnetTree};

/// One mirrored subnet with its carried-over note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    pub subnet: Ipv4,
    pub note: String,
}

/// Shift every leaf of `tree` onto `mirror_base`.
///
/// The mirror base must sit on the same block boundary as the tree root.
/// Notes are suffixed with the label (default `Mirror`) so both sides stay
/// distinguishable in a combined listing.
pub fn mirror_tree(
    tree: &SubnetTree,
    mirror_base: Ipv4Addr,
    label: &str,
) -> Result<Vec<MirrorEntry>, Box<dyn Error>> {
    let mask = tree.root().mask;
    if !is_block_aligned(mirror_base, mask) {
        return Err(format!("Mirror network must be aligned to /{mask} boundary").into());
    }
    let suffix = if label.is_empty() { "Mirror" } else { label };
    let root_base = u64::from(tree.root().base());
    let mirror_base = u64::from(u32::from(mirror_base));

    let entries = tree
        .leaves()
        .into_iter()
        .map(|leaf| {
            let offset = u64::from(leaf.subnet.base()) - root_base;
            let subnet = Ipv4 {
                addr: Ipv4Addr::from((mirror_base + offset) as u32),
                mask: leaf.subnet.mask,
            };
            MirrorEntry {
                subnet,
                note: format!("{} ({suffix})", leaf.note.unwrap_or_default()),
            }
        })
        .collect();
    Ok(entries)
}

/// Render mirror entries as allocator request lines (`name /size`).
pub fn mirror_request_lines(entries: &[MirrorEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let name = e.note.trim();
            let name = if name.starts_with('(') {
                // An unnamed source leaf mirrors under its own address.
                e.subnet.addr.to_string()
            } else {
                name.to_string()
            };
            format!("{name} /{}", e.subnet.mask)
        })
        .collect::<Vec<String>>()
        .join("\n")
}
