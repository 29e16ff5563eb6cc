//! Utilization and alignment analysis of an address plan.
//!
//! Checks a list of allocated ranges for boundary misalignment, overlap and
//! unallocated gaps, and totals up utilization. A tree produced purely by
//! split/join is structurally sound and reports full coverage; the range
//! form exists so externally-sourced plans can be audited too.

use itertools::Itertools;

use crate::models::{is_block_aligned, SubnetTree};

/// One allocated range under audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    /// First address, inclusive.
    pub start: u64,
    /// Last address, inclusive.
    pub end: u64,
    /// Display form, usually the CIDR string.
    pub label: String,
    /// Prefix length the range claims to have.
    pub mask: u8,
}

/// Outcome of an audit pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkAnalysis {
    pub total_subnets: usize,
    pub total_addresses: u64,
    pub allocated_addresses: u64,
    /// Share of the base network covered by allocations, 0-100.
    pub utilization_percent: f64,
    /// Hard problems: misaligned or overlapping ranges.
    pub issues: Vec<String>,
    /// Soft findings: unallocated gaps between ranges.
    pub warnings: Vec<String>,
}

/// Audit the leaves of a partition tree.
pub fn audit_tree(tree: &SubnetTree) -> NetworkAnalysis {
    let ranges: Vec<AddressRange> = tree
        .leaves()
        .iter()
        .map(|leaf| AddressRange {
            start: u64::from(leaf.subnet.base()),
            end: u64::from(leaf.subnet.base()) + leaf.subnet.size() - 1,
            label: leaf.subnet.to_string(),
            mask: leaf.subnet.mask,
        })
        .collect();
    audit_ranges(tree.root().size(), &ranges)
}

/// Audit an arbitrary set of allocated ranges against a total space size.
pub fn audit_ranges(total_addresses: u64, ranges: &[AddressRange]) -> NetworkAnalysis {
    let mut analysis = NetworkAnalysis {
        total_subnets: ranges.len(),
        total_addresses,
        ..Default::default()
    };

    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);

    for range in &sorted {
        analysis.allocated_addresses += range.end - range.start + 1;
        if !is_block_aligned((range.start as u32).into(), range.mask) {
            analysis.issues.push(format!(
                "{} is not properly aligned - invalid subnet boundary",
                range.label
            ));
        }
    }

    for (prev, curr) in sorted.iter().tuple_windows() {
        if curr.start <= prev.end {
            analysis.issues.push(format!(
                "Overlap detected: {} overlaps with {}",
                prev.label, curr.label
            ));
        } else if curr.start > prev.end + 1 {
            let gap = curr.start - prev.end - 1;
            analysis.warnings.push(format!(
                "Gap of {gap} addresses between {} and {}",
                prev.label, curr.label
            ));
        }
    }

    if total_addresses > 0 {
        analysis.utilization_percent =
            analysis.allocated_addresses as f64 / total_addresses as f64 * 100.0;
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ipv4, OperatingMode};

    fn range(cidr: &str) -> AddressRange {
        let subnet = Ipv4::new(cidr).unwrap();
        AddressRange {
            start: u64::from(subnet.base()),
            end: u64::from(subnet.base()) + subnet.size() - 1,
            label: subnet.to_string(),
            mask: subnet.mask,
        }
    }

    #[test]
    fn test_tree_audit_is_clean() {
        let mut tree = SubnetTree::new("10.0.0.0", 16).unwrap();
        tree.split(Ipv4::new("10.0.0.0/16").unwrap(), OperatingMode::Standard)
            .unwrap();
        tree.split(Ipv4::new("10.0.0.0/17").unwrap(), OperatingMode::Standard)
            .unwrap();

        let analysis = audit_tree(&tree);
        assert_eq!(analysis.total_subnets, 3);
        assert_eq!(analysis.total_addresses, 65536);
        assert_eq!(analysis.allocated_addresses, 65536);
        assert_eq!(analysis.utilization_percent, 100.0);
        assert!(analysis.issues.is_empty());
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn test_detects_gap() {
        let analysis = audit_ranges(
            65536,
            &[range("10.0.0.0/24"), range("10.0.2.0/24")],
        );
        assert_eq!(analysis.warnings.len(), 1);
        assert!(
            analysis.warnings[0].contains("Gap of 256 addresses"),
            "unexpected warning: {}",
            analysis.warnings[0]
        );
        assert!((analysis.utilization_percent - 0.78125).abs() < 1e-9);
    }

    #[test]
    fn test_detects_overlap() {
        let analysis = audit_ranges(
            65536,
            &[range("10.0.0.0/23"), range("10.0.1.0/24")],
        );
        assert_eq!(analysis.issues.len(), 1);
        assert!(analysis.issues[0].starts_with("Overlap detected: 10.0.0.0/23"));
    }

    #[test]
    fn test_detects_misalignment() {
        // 10.0.1.0 is not a valid /23 boundary.
        let analysis = audit_ranges(
            65536,
            &[AddressRange {
                start: u64::from(u32::from("10.0.1.0".parse::<std::net::Ipv4Addr>().unwrap())),
                end: u64::from(u32::from("10.0.2.255".parse::<std::net::Ipv4Addr>().unwrap())),
                label: "10.0.1.0/23".to_string(),
                mask: 23,
            }],
        );
        assert_eq!(analysis.issues.len(), 1);
        assert!(analysis.issues[0].contains("not properly aligned"));
    }
}
