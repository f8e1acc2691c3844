#![forbid(unsafe_code)]

mod error;
mod source;

pub use error::LoadError;
pub use source::*;

use ksv_core::{DeploymentRecord, ReferenceLookup};
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Script name -> deployment record, frozen after construction.
#[derive(Clone, Debug, Default)]
pub struct ReferenceStore {
    records: HashMap<String, DeploymentRecord>,
    fingerprint: Option<String>,
}

impl ReferenceStore {
    /// Reads every document of `source`; the first malformed one aborts the
    /// whole load.
    pub fn load(source: &impl DeploymentSource) -> Result<Self, LoadError> {
        let docs = source.documents()?;
        let mut records = HashMap::with_capacity(docs.len());
        let mut hasher = Sha256::new();

        for doc in &docs {
            let record: DeploymentRecord =
                serde_json::from_str(&doc.text).map_err(|e| LoadError::Malformed {
                    origin: doc.origin.clone(),
                    message: e.to_string(),
                })?;
            if record.name.trim().is_empty() {
                return Err(LoadError::MissingName {
                    origin: doc.origin.clone(),
                });
            }
            hasher.update(doc.origin.as_bytes());
            hasher.update([0u8]);
            hasher.update(doc.text.as_bytes());
            hasher.update([0u8]);

            if records.contains_key(&record.name) {
                tracing::debug!(
                    script = %record.name,
                    origin = %doc.origin,
                    "duplicate deployment record overrides an earlier one"
                );
            }
            records.insert(record.name.clone(), record);
        }

        let fingerprint = hex_digest(&hasher.finalize());
        tracing::info!(
            documents = docs.len(),
            scripts = records.len(),
            fingerprint = %fingerprint,
            "reference dataset loaded"
        );
        Ok(Self {
            records,
            fingerprint: Some(fingerprint),
        })
    }

    /// Builds a store from already-parsed records (no fingerprint).
    pub fn from_records(records: impl IntoIterator<Item = DeploymentRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect::<HashMap<_, _>>();
        Self {
            records,
            fingerprint: None,
        }
    }

    pub fn get(&self, script_name: &str) -> Option<&DeploymentRecord> {
        self.records.get(script_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = self.records.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// SHA-256 over the loaded documents, in load order.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl ReferenceLookup for ReferenceStore {
    fn lookup(&self, script_name: &str) -> Option<&DeploymentRecord> {
        self.get(script_name)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
