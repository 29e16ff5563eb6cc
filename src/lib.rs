// cargo watch -x 'fmt' -x 'run'  // 'run -- 10.0.0.0/16 requests.txt'

//! Interactive IPv4 subnet planner core.
//!
//! Maintains a hierarchical partition of a base network ([`SubnetTree`]),
//! packs named subnet requests into free space ([`processing`]) and
//! round-trips the whole plan through a compact shareable config
//! ([`codec`]).

pub mod codec;
pub mod models;
pub mod output;
pub mod processing;

use std::error::Error;

pub use models::{Ipv4, OperatingMode, SubnetTree};
pub use processing::{plan_and_apply, AllocationOutcome, SortOrder};

/// Build a fresh plan for a base network from raw request text.
///
/// Thin wrapper over [`processing::plan_and_apply`] with no padding,
/// alignment or reordering; the knobs live on [`processing::AllocationPlan`]
/// for callers that need them.
pub fn plan_network(
    base: &str,
    requests_text: &str,
    mode: OperatingMode,
) -> Result<(SubnetTree, AllocationOutcome), Box<dyn Error>> {
    let base = Ipv4::new(base)?;
    plan_and_apply(
        base,
        requests_text,
        "",
        "",
        false,
        SortOrder::Preserve,
        mode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_network() {
        let (tree, outcome) =
            plan_network("10.0.0.0/24", "a /26\nb /26\n", OperatingMode::Standard).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(tree.leaves().len(), 3);
    }
}
