#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a script's code hash is interpreted on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Data,
    Data1,
    Data2,
    Type,
}

impl HashType {
    pub const ALL: [HashType; 4] = [Self::Data, Self::Data1, Self::Data2, Self::Type];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Data1 => "data1",
            Self::Data2 => "data2",
            Self::Type => "type",
        }
    }

    pub fn is_data_family(self) -> bool {
        !matches!(self, Self::Type)
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashType {
    type Err = KindParseError;

    // Exact match only: "Type" or "DATA1" are not hash types.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| KindParseError::new("hashType", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepType {
    Code,
    DepGroup,
}

impl DepType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::DepGroup => "dep_group",
        }
    }
}

impl fmt::Display for DepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepType {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "dep_group" => Ok(Self::DepGroup),
            other => Err(KindParseError::new("depType", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Self::Mainnet, Self::Testnet];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(KindParseError::new("network", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindParseError {
    pub field: &'static str,
    pub value: String,
}

impl KindParseError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for KindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.field, self.value)
    }
}

impl std::error::Error for KindParseError {}
