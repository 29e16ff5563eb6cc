//! Compact (de)serialization of the partition tree.
//!
//! - [`position`] - Nth-position subnet coordinates (base-36 mask digit)
//! - [`config`] - version-tagged JSON configs and the share-URL form

mod config;
mod position;

// Re-export public functions
pub use config::{
    export_config, from_share_url, import_config, to_share_url, IdentityCompressor,
    StringCompressor, CONFIG_VERSION, URL_VERSION,
};
pub use position::{decode_nth, encode_nth, from_base36, to_base36};
