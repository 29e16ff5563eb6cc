//! Operating modes and their cloud-provider reservation policies.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Address-reservation policy for the network being planned.
///
/// The mode governs the smallest subnet a provider allows and how many
/// addresses at the start of each subnet are reserved for platform use:
///
/// - `Standard`: smallest /32, network + broadcast reserved
/// - `Aws`: smallest /28, network + VPC router + VPC DNS + future use + broadcast
/// - `Azure`: smallest /29, network + default gateway + 2x DNS mapping + broadcast
/// - `Oci`: smallest /30, network + default gateway + broadcast
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperatingMode {
    #[default]
    Standard,
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "AZURE")]
    Azure,
    #[serde(rename = "OCI")]
    Oci,
}

impl OperatingMode {
    /// Smallest (numerically largest) prefix length a subnet may have.
    ///
    /// A split producing children below this boundary is rejected.
    pub fn min_subnet_size(&self) -> u8 {
        match self {
            OperatingMode::Standard => 32,
            OperatingMode::Aws => 28,
            OperatingMode::Azure => 29,
            OperatingMode::Oci => 30,
        }
    }

    /// Number of addresses reserved at the start of each subnet's range,
    /// including the network address itself.
    pub fn reserved_head(&self) -> u8 {
        match self {
            OperatingMode::Standard => 1,
            OperatingMode::Aws | OperatingMode::Azure => 4,
            OperatingMode::Oci => 2,
        }
    }

    /// Regex pattern matching the prefix lengths this mode accepts for a
    /// base network input.
    pub fn netsize_pattern(&self) -> &'static str {
        match self {
            OperatingMode::Standard => r"^([12]?[0-9]|3[0-2])$",
            OperatingMode::Azure => r"^([12]?[0-9])$",
            OperatingMode::Aws => r"^(1?[0-9]|2[0-8])$",
            OperatingMode::Oci => r"^([12]?[0-9]|30)$",
        }
    }

    /// Wire spelling used in exported configs ("AWS", "AZURE", "OCI").
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Standard => "Standard",
            OperatingMode::Aws => "AWS",
            OperatingMode::Azure => "AZURE",
            OperatingMode::Oci => "OCI",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(OperatingMode::Standard),
            "AWS" => Ok(OperatingMode::Aws),
            "AZURE" => Ok(OperatingMode::Azure),
            "OCI" => Ok(OperatingMode::Oci),
            other => Err(format!("Unknown operating mode: {other}").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_min_subnet_sizes() {
        assert_eq!(OperatingMode::Standard.min_subnet_size(), 32);
        assert_eq!(OperatingMode::Aws.min_subnet_size(), 28);
        assert_eq!(OperatingMode::Azure.min_subnet_size(), 29);
        assert_eq!(OperatingMode::Oci.min_subnet_size(), 30);
    }

    #[test]
    fn test_reserved_heads() {
        assert_eq!(OperatingMode::Standard.reserved_head(), 1);
        assert_eq!(OperatingMode::Aws.reserved_head(), 4);
        assert_eq!(OperatingMode::Azure.reserved_head(), 4);
        assert_eq!(OperatingMode::Oci.reserved_head(), 2);
    }

    #[test]
    fn test_netsize_patterns() {
        let aws = Regex::new(OperatingMode::Aws.netsize_pattern()).unwrap();
        assert!(aws.is_match("28"));
        assert!(!aws.is_match("29"));

        let oci = Regex::new(OperatingMode::Oci.netsize_pattern()).unwrap();
        assert!(oci.is_match("30"));
        assert!(!oci.is_match("31"));

        let standard = Regex::new(OperatingMode::Standard.netsize_pattern()).unwrap();
        assert!(standard.is_match("32"));
        assert!(!standard.is_match("33"));
    }

    #[test]
    fn test_wire_spelling_round_trip() {
        for mode in [
            OperatingMode::Standard,
            OperatingMode::Aws,
            OperatingMode::Azure,
            OperatingMode::Oci,
        ] {
            assert_eq!(mode.as_str().parse::<OperatingMode>().unwrap(), mode);
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
            assert_eq!(serde_json::from_str::<OperatingMode>(&json).unwrap(), mode);
        }
    }
}
