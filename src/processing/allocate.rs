//! Auto-allocation of named subnet requests.
//!
//! Packs an ordered list of `name /size` requests into a base network with
//! sequential first-fit. Alignment and padding gaps are materialized as
//! `(spare)` blocks so the result remains an exact cover of the consumed
//! space, and the whole plan can then be realized into a [`SubnetTree`] by
//! repeated splitting.

use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::models::{block_size, Ipv4, OperatingMode, SubnetTree, MAX_LENGTH};

/// Smallest subnet size a request may ask for.
pub const MIN_REQUEST_SIZE: u8 = 9;
/// Name carried by filler blocks inserted for padding/alignment.
pub const SPARE_NAME: &str = "(spare)";

/// Maximum number of passes when realizing allocations into a tree.
const MAX_REALIZE_PASSES: usize = 50;

lazy_static! {
    // "name /26" or "name 26"; the name is everything up to the last
    // whitespace run before the trailing size token.
    static ref REQUEST_RE: Regex = Regex::new(r"^(.+?)\s+/?(\d+)$").expect("Invalid Regex?");
}

/// One named subnet request, parsed from a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    pub name: String,
    pub size: u8,
}

/// Order in which requests are packed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Keep the order the user wrote.
    #[default]
    Preserve,
    /// Sort by name.
    Alphabetical,
    /// Ascending prefix length, which places the largest blocks first and
    /// reduces fragmentation.
    Optimal,
}

impl FromStr for SortOrder {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(SortOrder::Preserve),
            "alphabetical" => Ok(SortOrder::Alphabetical),
            "optimal" => Ok(SortOrder::Optimal),
            other => Err(format!("Unknown sort order: {other}").into()),
        }
    }
}

/// Collected per-line request parse failures.
#[derive(Debug)]
pub struct RequestParseError {
    pub errors: Vec<String>,
}

impl fmt::Display for RequestParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.errors.join("\n"))
    }
}

impl Error for RequestParseError {}

/// A placed subnet, either named or `(spare)` filler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub name: String,
    pub subnet: Ipv4,
}

impl Allocation {
    pub fn is_spare(&self) -> bool {
        self.name == SPARE_NAME
    }
}

/// Result of a packing run: placed blocks in address order plus the
/// requests that did not fit.
#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    pub allocations: Vec<Allocation>,
    pub errors: Vec<String>,
}

impl AllocationOutcome {
    /// The named (non-spare) allocations.
    pub fn named(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| !a.is_spare())
    }

    /// The `(spare)` filler blocks.
    pub fn spares(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| a.is_spare())
    }
}

/// Fully validated input to [`allocate`].
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    /// Network the requests are packed into.
    pub base: Ipv4,
    /// Requests, already in packing order.
    pub requests: Vec<SubnetRequest>,
    /// Size of the gap block reserved after each allocation but the last.
    pub padding: Option<u8>,
    /// Boundary every allocation start is rounded up to.
    pub align: Option<u8>,
    /// Restrict alignment to requests at least as large as the alignment
    /// block; smaller requests pack at their natural alignment.
    pub align_large_only: bool,
}

impl AllocationPlan {
    /// Build a plan from raw user input, validating every field.
    ///
    /// Request-line errors are collected and reported together; padding and
    /// alignment failures carry the field name.
    pub fn from_inputs(
        base: Ipv4,
        requests_text: &str,
        padding_text: &str,
        align_text: &str,
        align_large_only: bool,
        sort: SortOrder,
    ) -> Result<AllocationPlan, Box<dyn Error>> {
        let padding =
            parse_subnet_size(padding_text).map_err(|e| format!("Invalid padding size. {e}"))?;
        let align =
            parse_subnet_size(align_text).map_err(|e| format!("Invalid alignment size. {e}"))?;
        let requests = parse_subnet_requests(requests_text, sort)?;
        if requests.is_empty() {
            return Err("Please enter subnet requirements".into());
        }
        Ok(AllocationPlan {
            base,
            requests,
            padding,
            align,
            align_large_only,
        })
    }

    /// Alignment boundary applying to a request of the given size.
    ///
    /// A block must always clear its own natural boundary too, so the
    /// effective boundary is the coarser of the two.
    fn effective_align(&self, size: u8) -> u8 {
        match self.align {
            Some(align) if !self.align_large_only || size <= align => align.min(size),
            _ => size,
        }
    }
}

/// Parse a padding/alignment field.
///
/// Empty, `0` and `/0` all mean "none"; otherwise the value must be a size
/// in /9../32, with or without the leading slash.
pub fn parse_subnet_size(input: &str) -> Result<Option<u8>, Box<dyn Error>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed == "/0" {
        return Ok(None);
    }

    let digits = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let size: u32 = if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse()?
    } else {
        return Err("Use empty, 0, /0, or /9 through /32".into());
    };
    if !(u32::from(MIN_REQUEST_SIZE)..=u32::from(MAX_LENGTH)).contains(&size) {
        return Err("Use empty, 0, /0, or /9 through /32".into());
    }
    Ok(Some(size as u8))
}

/// Parse the multi-line request text.
///
/// Blank lines are skipped. Every malformed line is reported (the whole
/// parse fails, nothing is allocated), then the surviving requests are
/// reordered per `sort`.
pub fn parse_subnet_requests(
    text: &str,
    sort: SortOrder,
) -> Result<Vec<SubnetRequest>, RequestParseError> {
    let mut requests = Vec::new();
    let mut errors = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match REQUEST_RE.captures(trimmed) {
            Some(caps) => {
                let name = caps[1].trim().to_string();
                let size: u32 = caps[2].parse().unwrap_or(u32::MAX);
                if !(u32::from(MIN_REQUEST_SIZE)..=u32::from(MAX_LENGTH)).contains(&size) {
                    errors.push(format!(
                        "{name}: Invalid subnet size /{} (must be /9 to /32)",
                        &caps[2]
                    ));
                } else {
                    requests.push(SubnetRequest {
                        name,
                        size: size as u8,
                    });
                }
            }
            None => errors.push(format!(
                "Line {}: Invalid format \"{trimmed}\" (use \"name /size\" or \"name size\")",
                i + 1
            )),
        }
    }

    if !errors.is_empty() {
        return Err(RequestParseError { errors });
    }

    match sort {
        SortOrder::Preserve => {}
        SortOrder::Alphabetical => requests.sort_by(|a, b| a.name.cmp(&b.name)),
        // Ascending prefix length puts the biggest address blocks first.
        SortOrder::Optimal => requests.sort_by_key(|r| r.size),
    }
    Ok(requests)
}

/// Pack the plan's requests into its base network.
///
/// A request that does not fit before the end of the base network is
/// recorded as an error and skipped without moving the cursor; the
/// remaining requests still run.
pub fn allocate(plan: &AllocationPlan) -> AllocationOutcome {
    let mut outcome = AllocationOutcome::default();
    let mut cursor = u64::from(plan.base.base());
    let end = u64::from(plan.base.base()) + plan.base.size();

    for (index, request) in plan.requests.iter().enumerate() {
        // Round up to this request's boundary, covering the skipped space
        // with spare blocks.
        let aligned = align_up(cursor, plan.effective_align(request.size));
        if aligned > cursor {
            fill_gap(&mut outcome.allocations, cursor, aligned);
            cursor = aligned;
        }

        let size = block_size(request.size);
        if cursor + size > end {
            log::warn!("no space for {} /{} at {cursor:#x}", request.name, request.size);
            outcome.errors.push(format!(
                "Not enough space for {} /{}",
                request.name, request.size
            ));
            continue;
        }

        outcome.allocations.push(Allocation {
            name: request.name.clone(),
            subnet: block_at(cursor, request.size),
        });
        cursor += size;

        // Padding and pre-alignment for the next request; never after the
        // last one.
        if index + 1 < plan.requests.len() {
            let mut target = cursor;
            if let Some(padding) = plan.padding {
                target += block_size(padding);
            }
            target = align_up(target, plan.effective_align(plan.requests[index + 1].size));
            if target > cursor {
                fill_gap(&mut outcome.allocations, cursor, target);
                cursor = target;
            }
        }
    }

    outcome
}

/// Realize allocations into `tree` by repeatedly splitting the smallest
/// existing ancestor leaf of each missing block, then note the named ones.
///
/// Returns error strings for named allocations that could not be realized
/// (the mode minimum stops splitting before reaching them).
pub fn apply_allocations(
    tree: &mut SubnetTree,
    allocations: &[Allocation],
    mode: OperatingMode,
) -> Vec<String> {
    for _pass in 0..MAX_REALIZE_PASSES {
        let mut all_found = true;
        for alloc in allocations {
            if tree.contains_leaf(alloc.subnet) {
                continue;
            }
            all_found = false;
            if let Some(leaf) = tree.leaf_covering(alloc.subnet) {
                if leaf.mask < alloc.subnet.mask {
                    if tree.split(leaf, mode).is_err() {
                        // Mode minimum reached; this allocation stays
                        // unrealized and is reported below.
                        continue;
                    }
                }
            }
        }
        if all_found {
            break;
        }
    }

    let mut errors = Vec::new();
    for alloc in allocations.iter().filter(|a| !a.is_spare()) {
        if tree.contains_leaf(alloc.subnet) {
            if let Err(e) = tree.set_note(alloc.subnet, &alloc.name) {
                errors.push(format!("Could not label {}: {e}", alloc.subnet));
            }
        } else {
            errors.push(format!(
                "Could not create {} for {}",
                alloc.subnet, alloc.name
            ));
        }
    }
    errors
}

/// Parse, pack and realize in one step, starting from a fresh tree.
///
/// Mirrors the interactive flow: the tree is reset to a single root leaf at
/// `base`, the plan is packed, and the result is split into place. Fatal
/// validation errors abort before any allocation; capacity and realization
/// errors are collected in the outcome.
#[allow(clippy::too_many_arguments)]
pub fn plan_and_apply(
    base: Ipv4,
    requests_text: &str,
    padding_text: &str,
    align_text: &str,
    align_large_only: bool,
    sort: SortOrder,
    mode: OperatingMode,
) -> Result<(SubnetTree, AllocationOutcome), Box<dyn Error>> {
    let plan = AllocationPlan::from_inputs(
        base,
        requests_text,
        padding_text,
        align_text,
        align_large_only,
        sort,
    )?;
    log::info!(
        "allocating {} requests into {base} (padding {:?}, align {:?})",
        plan.requests.len(),
        plan.padding,
        plan.align
    );
    let mut outcome = allocate(&plan);
    let mut tree = SubnetTree::from_node(base, crate::models::SubnetNode::leaf());
    let realize_errors = apply_allocations(&mut tree, &outcome.allocations, mode);
    outcome.errors.extend(realize_errors);
    Ok((tree, outcome))
}

fn block_at(addr: u64, size: u8) -> Ipv4 {
    Ipv4 {
        addr: Ipv4Addr::from(addr as u32),
        mask: size,
    }
}

fn align_up(cursor: u64, size: u8) -> u64 {
    let block = block_size(size);
    cursor.div_euclid(block) * block + if cursor % block == 0 { 0 } else { block }
}

/// Cover `[gap_start, target)` with spare blocks, largest first.
///
/// At each step the largest block that is both aligned at the current
/// position and fits before the target is emitted, which yields the fewest
/// fragments and keeps every spare block aligned.
fn fill_gap(allocations: &mut Vec<Allocation>, mut gap_start: u64, target: u64) {
    while gap_start < target {
        let mut best = MAX_LENGTH;
        for test in 1..=MAX_LENGTH {
            let block = block_size(test);
            if gap_start % block == 0 && gap_start + block <= target {
                best = test;
                break;
            }
        }
        allocations.push(Allocation {
            name: SPARE_NAME.to_string(),
            subnet: block_at(gap_start, best),
        });
        gap_start += block_size(best);
    }
}
