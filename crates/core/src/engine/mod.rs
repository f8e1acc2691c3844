#![forbid(unsafe_code)]

//! Field-by-field comparison of SDK-reported script metadata against the
//! reference deployment records.
//!
//! Every check after variant selection is cumulative: a code hash mismatch
//! does not hide a cell dep mismatch. Only three situations stop early: an
//! unknown script, a missing network entry, and a missing hash variant. A
//! cell dep count mismatch stops the cell dep comparison only.

mod compare;

use crate::model::{
    DeploymentRecord, HashType, Network, ScriptDescriptor, ValidationInput, ValidationResult,
    VariantKind,
};
use std::collections::{BTreeMap, HashMap};

/// Read-only access to deployment records by script name.
pub trait ReferenceLookup {
    fn lookup(&self, script_name: &str) -> Option<&DeploymentRecord>;
}

impl ReferenceLookup for HashMap<String, DeploymentRecord> {
    fn lookup(&self, script_name: &str) -> Option<&DeploymentRecord> {
        self.get(script_name)
    }
}

impl ReferenceLookup for BTreeMap<String, DeploymentRecord> {
    fn lookup(&self, script_name: &str) -> Option<&DeploymentRecord> {
        self.get(script_name)
    }
}

impl<T: ReferenceLookup + ?Sized> ReferenceLookup for &T {
    fn lookup(&self, script_name: &str) -> Option<&DeploymentRecord> {
        (**self).lookup(script_name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Compare data-family hash types against the record's own `hashType`
    /// instead of the descriptor's claim. Off by default, which lets e.g. a
    /// `data1` claim pass against a `data` deployment.
    pub strict_data_hash_type: bool,
}

pub struct Validator<'a, R: ReferenceLookup + ?Sized> {
    reference: &'a R,
    options: ValidatorOptions,
}

impl<'a, R: ReferenceLookup + ?Sized> Validator<'a, R> {
    pub fn new(reference: &'a R) -> Self {
        Self::with_options(reference, ValidatorOptions::default())
    }

    pub fn with_options(reference: &'a R, options: ValidatorOptions) -> Self {
        Self { reference, options }
    }

    pub fn validate(
        &self,
        script_name: &str,
        network: Network,
        descriptor: &ScriptDescriptor,
    ) -> ValidationResult {
        let errors = self.collect_errors(script_name, network, descriptor);
        ValidationResult::from_errors(script_name, network, errors)
    }

    /// Applies [`Validator::validate`] to each input; output order matches
    /// input order.
    pub fn validate_all(&self, inputs: &[ValidationInput]) -> Vec<ValidationResult> {
        inputs
            .iter()
            .map(|input| self.validate(&input.script_name, input.network, &input.descriptor))
            .collect()
    }

    fn collect_errors(
        &self,
        script_name: &str,
        network: Network,
        descriptor: &ScriptDescriptor,
    ) -> Vec<String> {
        let Some(record) = self.reference.lookup(script_name) else {
            return vec![format!("Script '{script_name}' not found in deployments")];
        };
        let Some(deployment) = record.network(network) else {
            return vec![format!(
                "No {network} configuration found for script '{script_name}'"
            )];
        };

        let kind = VariantKind::for_hash_type(descriptor.hash_type);
        let variant = deployment.variant(kind);
        let missing = || {
            vec![format!(
                "Missing {} hash configuration for script '{script_name}' on {network}",
                kind.as_str()
            )]
        };
        let Some(expected_code_hash) = variant.and_then(|v| v.code_hash.as_deref()) else {
            return missing();
        };
        let expected_hash_type = match kind {
            VariantKind::Type => HashType::Type,
            // Strict mode needs the record's own hashType to compare against.
            VariantKind::Data if self.options.strict_data_hash_type => {
                match variant.and_then(|v| v.hash_type) {
                    Some(hash_type) => hash_type,
                    None => return missing(),
                }
            }
            VariantKind::Data => descriptor.hash_type,
        };

        let mut errors = Vec::new();
        if !compare::hex_eq(expected_code_hash, &descriptor.code_hash) {
            errors.push(format!(
                "CodeHash mismatch: expected {expected_code_hash}, got {}",
                descriptor.code_hash
            ));
        }
        if expected_hash_type != descriptor.hash_type {
            errors.push(format!(
                "HashType mismatch: expected {expected_hash_type}, got {}",
                descriptor.hash_type
            ));
        }

        let expected_deps = &deployment.cell_deps;
        let actual_deps = &descriptor.cell_deps;
        if expected_deps.len() != actual_deps.len() {
            errors.push(format!(
                "CellDeps count mismatch: expected {}, got {}",
                expected_deps.len(),
                actual_deps.len()
            ));
        } else {
            compare::diff_cell_deps(expected_deps, actual_deps, &mut errors);
        }
        errors
    }
}

impl<R: ReferenceLookup + Sync + ?Sized> Validator<'_, R> {
    /// Same output as [`Validator::validate_all`], computed on up to
    /// `workers` scoped threads.
    pub fn validate_all_parallel(
        &self,
        inputs: &[ValidationInput],
        workers: usize,
    ) -> Vec<ValidationResult> {
        let workers = workers.max(1);
        if workers == 1 || inputs.len() < 2 {
            return self.validate_all(inputs);
        }
        let chunk = inputs.len().div_ceil(workers);
        std::thread::scope(|s| {
            let handles = inputs
                .chunks(chunk)
                .map(|part| s.spawn(move || self.validate_all(part)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(results) => results,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}
