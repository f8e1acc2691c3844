#![forbid(unsafe_code)]

use super::normalize::{camel_to_snake, canonical_script_name};
use super::{AdapterError, Extraction, SdkAdapter, SdkFamily, parse_script_entries};
use serde_json::Value;

const PACKAGES: &[&str] = &["@ckb-ccc/core", "@ckb-ccc/shell", "@ckb-ccc/ccc"];

/// CCC: `KnownScript` values (`Secp256k1Blake160`, `NervosDao`, ...) resolved
/// through the public mainnet/testnet clients.
pub(crate) struct CccAdapter;

impl SdkAdapter for CccAdapter {
    fn family(&self) -> SdkFamily {
        SdkFamily::Ccc
    }

    fn supports(&self, package_name: &str) -> bool {
        PACKAGES.contains(&package_name)
    }

    fn extraction_script(&self) -> &'static str {
        include_str!("js/ccc.js")
    }

    fn parse_extraction(&self, output: &Value) -> Result<Extraction, AdapterError> {
        parse_script_entries(self.family(), output, |raw| {
            canonical_script_name(&camel_to_snake(raw))
        })
    }
}
