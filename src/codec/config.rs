//! Shareable configuration export/import.
//!
//! The on-the-wire shape is a small version-tagged JSON object:
//!
//! ```text
//! v1: { config_version: "1", base_network: "A.B.C.D/N",
//!       subnets: { "<CIDR>": { _n?, _c?, ...child CIDRs }, ... } }
//! v2: { config_version: "2", operating_mode?: "AWS"|"AZURE"|"OCI",
//!       base_network: "A.B.C.D/N",
//!       subnets: { "<nth><base36 size>": { n?, c?, ...child codes }, ... } }
//! ```
//!
//! The compact URL form renames the top-level keys to one letter each and
//! runs the JSON through an injected compressor.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::error::Error;

use super::position::{decode_nth, encode_nth};
use crate::models::{Ipv4, OperatingMode, SubnetNode, SubnetTree};

/// Version written by [`export_config`].
pub const CONFIG_VERSION: &str = "2";
/// Version prefix of the compact URL form.
pub const URL_VERSION: char = '1';

/// Reversible string compression, injected by the caller.
///
/// `decompress(compress(s)) == s` must hold for every valid input; the
/// algorithm itself (LZ, base64, ...) is not this crate's concern.
pub trait StringCompressor {
    fn compress(&self, input: &str) -> String;
    fn decompress(&self, input: &str) -> Result<String, Box<dyn Error>>;
}

/// Pass-through compressor for tests and debugging.
pub struct IdentityCompressor;

impl StringCompressor for IdentityCompressor {
    fn compress(&self, input: &str) -> String {
        input.to_string()
    }

    fn decompress(&self, input: &str) -> Result<String, Box<dyn Error>> {
        Ok(input.to_string())
    }
}

/// Export a tree as a version-2 config object.
///
/// `operating_mode` is omitted for the Standard default. When `minified`
/// the subnet keys are Nth-position codes relative to the tree root and
/// metadata uses the short `n`/`c` keys; otherwise keys are full CIDR
/// strings with `_note`/`_color` metadata. The ordered-pair tree makes the
/// exported structure canonical (address-sorted) in both forms.
pub fn export_config(tree: &SubnetTree, mode: OperatingMode, minified: bool) -> Value {
    let root = tree.root();
    let mut subnets = Map::new();
    if minified {
        subnets.insert(encode_nth(root, root), minify_node(tree.node(), root, root));
    } else {
        subnets.insert(root.to_string(), full_node(tree.node(), root));
    }

    let mut config = Map::new();
    config.insert("config_version".to_string(), json!(CONFIG_VERSION));
    if mode != OperatingMode::Standard {
        config.insert("operating_mode".to_string(), json!(mode.as_str()));
    }
    config.insert("base_network".to_string(), json!(root.to_string()));
    config.insert("subnets".to_string(), Value::Object(subnets));
    Value::Object(config)
}

fn minify_node(node: &SubnetNode, cidr: Ipv4, root: Ipv4) -> Value {
    let mut map = Map::new();
    match node {
        SubnetNode::Leaf { note, color } => {
            if let Some(n) = note {
                map.insert("n".to_string(), json!(n));
            }
            if let Some(c) = color {
                map.insert("c".to_string(), json!(c));
            }
        }
        SubnetNode::Split { low, high } => {
            let (l, h) = cidr.halves().expect("split node below /32");
            map.insert(encode_nth(root, l), minify_node(low, l, root));
            map.insert(encode_nth(root, h), minify_node(high, h, root));
        }
    }
    Value::Object(map)
}

fn full_node(node: &SubnetNode, cidr: Ipv4) -> Value {
    let mut map = Map::new();
    match node {
        SubnetNode::Leaf { note, color } => {
            if let Some(n) = note {
                map.insert("_note".to_string(), json!(n));
            }
            if let Some(c) = color {
                map.insert("_color".to_string(), json!(c));
            }
        }
        SubnetNode::Split { low, high } => {
            let (l, h) = cidr.halves().expect("split node below /32");
            map.insert(l.to_string(), full_node(low, l));
            map.insert(h.to_string(), full_node(high, h));
        }
    }
    Value::Object(map)
}

#[derive(Deserialize, Debug)]
struct ConfigEnvelope {
    config_version: String,
    #[serde(default)]
    operating_mode: Option<OperatingMode>,
    #[serde(default)]
    base_network: Option<String>,
    subnets: Map<String, Value>,
}

/// Import a config object (either version) back into a tree.
///
/// Any malformed input - unknown version, missing base network, children
/// that are not the two halves of their parent - is a fatal error; nothing
/// is silently defaulted.
pub fn import_config(config: &Value) -> Result<(SubnetTree, OperatingMode), Box<dyn Error>> {
    let envelope: ConfigEnvelope = serde_path_to_error::deserialize(config)
        .map_err(|e| format!("Invalid config at {}: {}", e.path(), e.inner()))?;
    let mode = envelope.operating_mode.unwrap_or_default();

    let (root_key, root_value) = envelope
        .subnets
        .iter()
        .next()
        .ok_or("Config has no subnets")?;

    let tree = match envelope.config_version.as_str() {
        "1" => {
            // Version 1 keys are full CIDR strings and double as the base
            // network declaration.
            let root = Ipv4::new(root_key)?;
            let node = node_from_map(as_object(root_value)?, root, KeyStyle::FullCidr)?;
            SubnetTree::from_node(root, node)
        }
        "2" => {
            let base = envelope
                .base_network
                .as_deref()
                .ok_or("Version 2 config requires base_network")?;
            let root = Ipv4::new(base)?;
            let style = if root_key.contains('/') {
                KeyStyle::FullCidr
            } else {
                KeyStyle::Position { base: root }
            };
            let decoded = style.decode_key(root_key)?;
            if decoded != root {
                return Err(
                    format!("Subnet root {decoded} does not match base network {root}").into(),
                );
            }
            let node = node_from_map(as_object(root_value)?, root, style)?;
            SubnetTree::from_node(root, node)
        }
        other => return Err(format!("Unknown config version \"{other}\"").into()),
    };

    if !tree.validate_min_size(mode) {
        log::warn!(
            "imported tree has subnets below the /{} minimum for {mode} mode",
            mode.min_subnet_size()
        );
    }
    Ok((tree, mode))
}

#[derive(Copy, Clone)]
enum KeyStyle {
    /// Full `"A.B.C.D/N"` keys, `_note`/`_color` metadata (v1 and
    /// non-minified v2; v1 also accepts the `_n`/`_c` short forms).
    FullCidr,
    /// Nth-position keys relative to the base network, `n`/`c` metadata.
    Position { base: Ipv4 },
}

impl KeyStyle {
    fn is_meta(&self, key: &str) -> bool {
        match self {
            KeyStyle::FullCidr => key.starts_with('_'),
            KeyStyle::Position { .. } => key == "n" || key == "c",
        }
    }

    fn decode_key(&self, key: &str) -> Result<Ipv4, Box<dyn Error>> {
        match self {
            KeyStyle::FullCidr => Ipv4::new(key),
            KeyStyle::Position { base } => decode_nth(*base, key),
        }
    }

    fn note_of(&self, map: &Map<String, Value>) -> Result<Option<String>, Box<dyn Error>> {
        match self {
            KeyStyle::FullCidr => meta_string(map, &["_note", "_n"]),
            KeyStyle::Position { .. } => meta_string(map, &["n"]),
        }
    }

    fn color_of(&self, map: &Map<String, Value>) -> Result<Option<String>, Box<dyn Error>> {
        match self {
            KeyStyle::FullCidr => meta_string(map, &["_color", "_c"]),
            KeyStyle::Position { .. } => meta_string(map, &["c"]),
        }
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, Box<dyn Error>> {
    value
        .as_object()
        .ok_or_else(|| format!("Expected an object, got {value}").into())
}

fn meta_string(
    map: &Map<String, Value>,
    keys: &[&str],
) -> Result<Option<String>, Box<dyn Error>> {
    for key in keys {
        if let Some(value) = map.get(*key) {
            let s = value
                .as_str()
                .ok_or_else(|| format!("Metadata \"{key}\" must be a string, got {value}"))?;
            if !s.is_empty() {
                return Ok(Some(s.to_string()));
            }
            return Ok(None);
        }
    }
    Ok(None)
}

fn node_from_map(
    map: &Map<String, Value>,
    cidr: Ipv4,
    style: KeyStyle,
) -> Result<SubnetNode, Box<dyn Error>> {
    let children: Vec<(Ipv4, &Value)> = map
        .iter()
        .filter(|(key, _)| !style.is_meta(key.as_str()))
        .map(|(key, value)| Ok((style.decode_key(key)?, value)))
        .collect::<Result<_, Box<dyn Error>>>()?;

    if children.is_empty() {
        return Ok(SubnetNode::Leaf {
            note: style.note_of(map)?,
            color: style.color_of(map)?,
        });
    }

    let (low_cidr, high_cidr) = cidr.halves().map_err(|_| {
        format!("Config error: {cidr} carries children but cannot be split")
    })?;
    let mut low = None;
    let mut high = None;
    for (child, value) in children {
        if child == low_cidr {
            low = Some(node_from_map(as_object(value)?, low_cidr, style)?);
        } else if child == high_cidr {
            high = Some(node_from_map(as_object(value)?, high_cidr, style)?);
        } else {
            return Err(format!("Config error: {child} is not a half of {cidr}").into());
        }
    }
    match (low, high) {
        (Some(low), Some(high)) => Ok(SubnetNode::Split {
            low: Box::new(low),
            high: Box::new(high),
        }),
        _ => Err(format!("Config error: {cidr} must carry both halves").into()),
    }
}

/// Render a tree as the compact share-URL parameter value.
pub fn to_share_url(
    tree: &SubnetTree,
    mode: OperatingMode,
    compressor: &impl StringCompressor,
) -> String {
    let config = export_config(tree, mode, true);
    let mut short = Map::new();
    if let Value::Object(full) = config {
        for (key, value) in full {
            let short_key = match key.as_str() {
                "config_version" => "v",
                "base_network" => "b",
                "operating_mode" => "m",
                "subnets" => "s",
                other => other,
            };
            short.insert(short_key.to_string(), value);
        }
    }
    let payload = Value::Object(short).to_string();
    format!("{URL_VERSION}{}", compressor.compress(&payload))
}

/// Decode a compact share-URL parameter back into a tree.
pub fn from_share_url(
    param: &str,
    compressor: &impl StringCompressor,
) -> Result<(SubnetTree, OperatingMode), Box<dyn Error>> {
    let mut chars = param.chars();
    let version = chars.next().ok_or("Empty share URL parameter")?;
    if version != URL_VERSION {
        return Err(format!("Unknown share URL version '{version}'").into());
    }
    let payload = compressor.decompress(chars.as_str())?;
    let short: Value = serde_json::from_str(&payload)?;
    let short = as_object(&short)?;

    let mut full = Map::new();
    for (key, value) in short {
        let full_key = match key.as_str() {
            "v" => "config_version",
            "b" => "base_network",
            "m" => "operating_mode",
            "s" => "subnets",
            other => other,
        };
        full.insert(full_key.to_string(), value.clone());
    }
    import_config(&Value::Object(full))
}
