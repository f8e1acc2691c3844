#![forbid(unsafe_code)]

use super::{DepType, HashType, Network};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub tx_hash: String,
    /// Kept as reported: SDKs disagree on `"0x1"` versus `"1"`.
    pub index: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDep {
    pub dep_type: DepType,
    pub out_point: OutPoint,
}

impl CellDep {
    pub fn new(dep_type: DepType, tx_hash: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            dep_type,
            out_point: OutPoint {
                tx_hash: tx_hash.into(),
                index: index.into(),
            },
        }
    }
}

/// Script metadata as reported by an SDK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    pub code_hash: String,
    pub hash_type: HashType,
    #[serde(default)]
    pub cell_deps: Vec<CellDep>,
}

/// One `(scriptName, network, descriptor)` tuple handed over by an adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationInput {
    pub script_name: String,
    pub network: Network,
    pub descriptor: ScriptDescriptor,
}

impl ValidationInput {
    pub fn new(
        script_name: impl Into<String>,
        network: Network,
        descriptor: ScriptDescriptor,
    ) -> Self {
        Self {
            script_name: script_name.into(),
            network,
            descriptor,
        }
    }
}
