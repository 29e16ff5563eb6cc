//! Per-leaf row facts for table consumers.

use crate::models::{
    address_type, cidr_mask_addr, host_count, last_address, usable_first, usable_last,
    AddressType, Ipv4, LeafRow, OperatingMode, SubnetTree,
};
use std::net::Ipv4Addr;

/// Everything a table renderer needs to know about one subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRow {
    /// Full CIDR, e.g. `10.0.0.0/24`.
    pub subnet: String,
    /// Base address alone.
    pub ip: String,
    /// Prefix length alone, e.g. `/24`.
    pub cidr: String,
    /// Dotted-quad subnet mask.
    pub mask: String,
    pub address_type: AddressType,
    /// `first - last`, or the single address for a /32.
    pub range: String,
    /// Usable range under the active mode.
    pub usable: String,
    pub hosts: u64,
    pub note: String,
    pub color: String,
}

/// Build one row per leaf, in address order.
pub fn build_rows(tree: &SubnetTree, mode: OperatingMode) -> Vec<SubnetRow> {
    tree.leaves()
        .into_iter()
        .map(|leaf| leaf_row(&leaf, mode))
        .collect()
}

/// The summary row for the tree's root network.
pub fn parent_row(tree: &SubnetTree, mode: OperatingMode) -> SubnetRow {
    let mut row = subnet_row(tree.root(), mode);
    row.note = "Parent Network".to_string();
    row
}

fn leaf_row(leaf: &LeafRow, mode: OperatingMode) -> SubnetRow {
    let mut row = subnet_row(leaf.subnet, mode);
    row.note = leaf.note.clone().unwrap_or_default();
    row.color = leaf.color.clone().unwrap_or_default();
    row
}

fn subnet_row(subnet: Ipv4, mode: OperatingMode) -> SubnetRow {
    let base = subnet.base();
    let mask = subnet.mask;
    let first = Ipv4Addr::from(base);
    let last = Ipv4Addr::from(last_address(base, mask));
    let u_first = Ipv4Addr::from(usable_first(base, mask, mode));
    let u_last = Ipv4Addr::from(usable_last(base, mask));

    let (range, usable) = if mask < 32 {
        (format!("{first} - {last}"), format!("{u_first} - {u_last}"))
    } else {
        (first.to_string(), u_first.to_string())
    };

    SubnetRow {
        subnet: subnet.to_string(),
        ip: first.to_string(),
        cidr: format!("/{mask}"),
        mask: cidr_mask_addr(mask)
            .map(|m| m.to_string())
            .unwrap_or_default(),
        address_type: address_type(first),
        range,
        usable,
        hosts: host_count(base, mask, mode),
        note: String::new(),
        color: String::new(),
    }
}
