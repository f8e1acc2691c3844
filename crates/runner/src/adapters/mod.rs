#![forbid(unsafe_code)]

//! One adapter per SDK family. An adapter knows how to pull known-script
//! metadata out of an installed package (a small Node.js program) and how to
//! turn that program's JSON into validation inputs. Package identity picks
//! the adapter; the Rust side never inspects SDK method names at runtime.

pub(crate) mod ccc;
pub(crate) mod lumos;
mod normalize;

use ksv_core::{CellDep, Network, ScriptDescriptor, ValidationInput};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SdkFamily {
    Ccc,
    Lumos,
}

impl SdkFamily {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SdkFamily::Ccc => "ccc",
            SdkFamily::Lumos => "lumos",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum AdapterError {
    #[error("{family} output: {message}")]
    Shape {
        family: &'static str,
        message: String,
    },
    #[error("{family} script {script}: {message}")]
    Entry {
        family: &'static str,
        script: String,
        message: String,
    },
}

/// Descriptors pulled from one SDK. `skipped` holds scripts the SDK itself
/// could not describe; `rejected` holds entries it described in a form no
/// descriptor can be built from. Neither is validated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Extraction {
    pub(crate) inputs: Vec<ValidationInput>,
    pub(crate) skipped: Vec<String>,
    pub(crate) rejected: Vec<String>,
}

pub(crate) trait SdkAdapter: Sync {
    fn family(&self) -> SdkFamily;

    fn supports(&self, package_name: &str) -> bool;

    /// Node.js program printing one JSON document on stdout. It reads the
    /// package name from `KSV_SDK_PACKAGE` and the install prefix from
    /// `KSV_SDK_DIR`.
    fn extraction_script(&self) -> &'static str;

    fn parse_extraction(&self, output: &Value) -> Result<Extraction, AdapterError>;
}

static ADAPTERS: [&dyn SdkAdapter; 2] = [&ccc::CccAdapter, &lumos::LumosAdapter];

pub(crate) fn adapter_for(package_name: &str) -> Option<&'static dyn SdkAdapter> {
    ADAPTERS
        .iter()
        .copied()
        .find(|adapter| adapter.supports(package_name))
}

/// Both extraction scripts print `{"scripts": [entry, ...]}` where an entry
/// is either a descriptor (`name`, `network`, `codeHash`, `hashType`,
/// `cellDeps`) or `name`, `network`, `error`. Only the script naming
/// differs per family.
fn parse_script_entries(
    family: SdkFamily,
    output: &Value,
    script_name: impl Fn(&str) -> String,
) -> Result<Extraction, AdapterError> {
    let shape = |message: String| AdapterError::Shape {
        family: family.as_str(),
        message,
    };
    let entries = output
        .get("scripts")
        .and_then(Value::as_array)
        .ok_or_else(|| shape("missing \"scripts\" array".to_string()))?;

    let mut extraction = Extraction::default();
    for (position, entry) in entries.iter().enumerate() {
        match parse_entry(family, entry, &script_name) {
            Ok(ParsedEntry::Input(input)) => extraction.inputs.push(input),
            Ok(ParsedEntry::Unavailable(note)) => extraction.skipped.push(note),
            Err(err) => {
                tracing::warn!(family = family.as_str(), position, error = %err, "sdk entry rejected");
                extraction.rejected.push(err.to_string());
            }
        }
    }
    Ok(extraction)
}

enum ParsedEntry {
    Input(ValidationInput),
    Unavailable(String),
}

fn parse_entry(
    family: SdkFamily,
    entry: &Value,
    script_name: &impl Fn(&str) -> String,
) -> Result<ParsedEntry, AdapterError> {
    let name = match normalize::str_field(entry, "name") {
        Ok(raw) => script_name(raw),
        Err(message) => {
            return Err(AdapterError::Entry {
                family: family.as_str(),
                script: "<unnamed>".to_string(),
                message,
            });
        }
    };
    let entry_err = |message: String| AdapterError::Entry {
        family: family.as_str(),
        script: name.clone(),
        message,
    };
    let network = normalize::str_field(entry, "network")
        .map_err(&entry_err)?
        .parse::<Network>()
        .map_err(|e| entry_err(e.to_string()))?;

    if let Some(error) = entry.get("error") {
        let error = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        tracing::debug!(family = family.as_str(), script = %name, %network, %error, "sdk could not describe script");
        return Ok(ParsedEntry::Unavailable(format!("{name} ({network}): {error}")));
    }

    let descriptor = parse_descriptor(entry).map_err(&entry_err)?;
    Ok(ParsedEntry::Input(ValidationInput::new(name, network, descriptor)))
}

fn parse_descriptor(entry: &Value) -> Result<ScriptDescriptor, String> {
    let code_hash = normalize::str_field(entry, "codeHash")?.to_string();
    let hash_type = normalize::hash_type(normalize::str_field(entry, "hashType")?)?;
    let cell_deps = match entry.get("cellDeps") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(deps)) => deps
            .iter()
            .map(parse_cell_dep)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(format!("cellDeps is not an array: {other}")),
    };
    Ok(ScriptDescriptor {
        code_hash,
        hash_type,
        cell_deps,
    })
}

fn parse_cell_dep(dep: &Value) -> Result<CellDep, String> {
    let dep_type = normalize::dep_type(normalize::str_field(dep, "depType")?)?;
    let out_point = dep
        .get("outPoint")
        .ok_or_else(|| "cell dep without outPoint".to_string())?;
    let tx_hash = normalize::str_field(out_point, "txHash")?;
    let index = normalize::index(out_point.get("index").unwrap_or(&Value::Null))?;
    Ok(CellDep::new(dep_type, tx_hash, index))
}
