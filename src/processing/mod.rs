//! Planning logic on top of the partition tree.
//!
//! - [`allocate`] - request parsing and first-fit packing
//! - [`mirror`] - blue/green mirror plan generation
//! - [`audit`] - utilization and alignment analysis

mod allocate;
mod audit;
mod mirror;

// Re-export public functions
pub use allocate::{
    allocate, apply_allocations, parse_subnet_requests, parse_subnet_size, plan_and_apply,
    Allocation, AllocationOutcome, AllocationPlan, RequestParseError, SortOrder, SubnetRequest,
    MIN_REQUEST_SIZE, SPARE_NAME,
};
pub use audit::{audit_ranges, audit_tree, AddressRange, NetworkAnalysis};
pub use mirror::{mirror_request_lines, mirror_tree, MirrorEntry};
