//! Nth-position subnet coordinates.
//!
//! Represents a subnet by its ordinal position among the same-size blocks of
//! a base network, plus its mask in one base-36 digit. This keeps shared
//! configs short: `192.168.200.210/31` inside `192.168.200.192/27` becomes
//! `"9v"` (the 9th /31, mask 31 = base-36 `v`). The code only has meaning
//! relative to its base network, and `nth` + mask uniquely determine the
//! absolute block, so the encoding is exactly reversible.

use std::error::Error;
use std::net::Ipv4Addr;

use crate::models::{Ipv4, MAX_LENGTH};

/// Encode a value 0-35 as a single base-36 digit.
pub fn to_base36(num: u8) -> char {
    assert!(num < 36, "base36 digit out of range: {num}");
    std::char::from_digit(u32::from(num), 36).unwrap_or_else(|| panic!("bad base36 digit {num}"))
}

/// Decode a single base-36 digit.
pub fn from_base36(digit: char) -> Result<u8, Box<dyn Error>> {
    digit
        .to_digit(36)
        .map(|d| d as u8)
        .ok_or_else(|| format!("Invalid base36 digit '{digit}'").into())
}

/// Encode `subnet` as its Nth-position code within `base`.
///
/// The caller must pass a subnet that actually lies inside the base block.
pub fn encode_nth(base: Ipv4, subnet: Ipv4) -> String {
    debug_assert!(base.contains_block(&subnet), "{subnet} not within {base}");
    let offset = u64::from(subnet.base()) - u64::from(base.base());
    let nth = offset >> (MAX_LENGTH - subnet.mask);
    format!("{}{}", nth, to_base36(subnet.mask))
}

/// Decode an Nth-position code back to an absolute subnet within `base`.
pub fn decode_nth(base: Ipv4, code: &str) -> Result<Ipv4, Box<dyn Error>> {
    if code.len() < 2 || !code.is_ascii() {
        return Err(format!("Invalid position code \"{code}\"").into());
    }
    let (nth_part, mask_part) = code.split_at(code.len() - 1);
    let mask = from_base36(mask_part.chars().next().unwrap_or('!'))?;
    if mask > MAX_LENGTH {
        return Err(format!("Invalid subnet size /{mask} in position code \"{code}\"").into());
    }
    let nth: u32 = nth_part
        .parse()
        .map_err(|_| format!("Invalid position \"{nth_part}\" in position code \"{code}\""))?;

    let offset = u64::from(nth) << (MAX_LENGTH - mask);
    if offset >= 1u64 << 32 {
        return Err(format!("Position code \"{code}\" overflows the address space").into());
    }
    let addr = u64::from(base.base()) + offset;
    if addr > u64::from(u32::MAX) {
        return Err(format!("Position code \"{code}\" overflows the address space").into());
    }

    let subnet = Ipv4::from_parts(Ipv4Addr::from(addr as u32), mask)?;
    if !base.contains_block(&subnet) {
        return Err(format!("Position code \"{code}\" lies outside {base}").into());
    }
    Ok(subnet)
}
