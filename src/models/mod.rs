//! Domain models for the subnet planner.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Ipv4`] - block-aligned CIDR network with address math helpers
//! - [`OperatingMode`] - cloud-provider reservation policy
//! - [`SubnetTree`] / [`SubnetNode`] - the hierarchical partition tree

mod ipv4;
mod mode;
mod tree;

// Re-export public types
pub use ipv4::{
    address_type, block_size, cidr_mask, cidr_mask_addr, host_count, is_block_aligned, is_rfc1918,
    is_rfc6598, last_address, normalize_to_block, usable_first, usable_last, AddressType, Ipv4,
    MAX_LENGTH,
};
pub use mode::OperatingMode;
pub use tree::{LeafRow, SubnetNode, SubnetTree};
