#![forbid(unsafe_code)]

use super::{CellDep, HashType, Network};
use serde::{Deserialize, Serialize};

/// One expected `(codeHash, hashType)` pairing. Both fields are optional so a
/// record with holes still loads and fails at validation time instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_type: Option<HashType>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ScriptVariant>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<ScriptVariant>,
    /// Shared by both variants.
    #[serde(default)]
    pub cell_deps: Vec<CellDep>,
}

impl NetworkDeployment {
    pub fn variant(&self, kind: VariantKind) -> Option<&ScriptVariant> {
        match kind {
            VariantKind::Data => self.data.as_ref(),
            VariantKind::Type => self.type_.as_ref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mainnet: Option<NetworkDeployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testnet: Option<NetworkDeployment>,
}

impl DeploymentRecord {
    pub fn network(&self, network: Network) -> Option<&NetworkDeployment> {
        match network {
            Network::Mainnet => self.mainnet.as_ref(),
            Network::Testnet => self.testnet.as_ref(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantKind {
    Data,
    Type,
}

impl VariantKind {
    pub fn for_hash_type(hash_type: HashType) -> Self {
        if hash_type.is_data_family() {
            Self::Data
        } else {
            Self::Type
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Type => "type",
        }
    }
}
