#![forbid(unsafe_code)]

use super::Network;
use serde::Serialize;

/// Verdict for one descriptor. Built once by the engine; fields are only
/// readable from outside the crate so a result cannot drift from its errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    script_name: String,
    network: Network,
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn from_errors(script_name: &str, network: Network, errors: Vec<String>) -> Self {
        Self {
            script_name: script_name.to_string(),
            network,
            is_valid: errors.is_empty(),
            errors,
            warnings: Vec::new(),
        }
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
