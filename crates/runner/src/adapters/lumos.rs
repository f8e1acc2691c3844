#![forbid(unsafe_code)]

use super::normalize::canonical_script_name;
use super::{AdapterError, Extraction, SdkAdapter, SdkFamily, parse_script_entries};
use serde_json::Value;

const PACKAGES: &[&str] = &["@ckb-lumos/config-manager", "@ckb-lumos/lumos"];

/// Lumos: `predefined.LINA` / `predefined.AGGRON4` script tables keyed by
/// SCREAMING_SNAKE names, one cell dep per script.
pub(crate) struct LumosAdapter;

impl SdkAdapter for LumosAdapter {
    fn family(&self) -> SdkFamily {
        SdkFamily::Lumos
    }

    fn supports(&self, package_name: &str) -> bool {
        PACKAGES.contains(&package_name)
    }

    fn extraction_script(&self) -> &'static str {
        include_str!("js/lumos.js")
    }

    fn parse_extraction(&self, output: &Value) -> Result<Extraction, AdapterError> {
        parse_script_entries(self.family(), output, |raw| {
            canonical_script_name(&raw.to_ascii_lowercase())
        })
    }
}
