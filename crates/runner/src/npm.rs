#![forbid(unsafe_code)]

use crate::adapters::adapter_for;
use crate::error::RunnerError;
use crate::process::run_captured;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PackageSpec {
    pub(crate) name: String,
    pub(crate) version: Option<String>,
}

impl PackageSpec {
    /// `name`, `name@1.2.3`, `@scope/name` or `@scope/name@1.2.3`.
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (scope_prefix, rest) = match raw.strip_prefix('@') {
            Some(rest) => ("@", rest),
            None => ("", raw),
        };
        let (name, version) = match rest.split_once('@') {
            Some((name, version)) => (name, Some(version.trim())),
            None => (rest, None),
        };
        if name.is_empty() || (scope_prefix == "@" && !name.contains('/')) {
            return Err(format!("invalid package spec: {raw:?}"));
        }
        if version.is_some_and(str::is_empty) {
            return Err(format!("empty version in package spec: {raw:?}"));
        }
        Ok(Self {
            name: format!("{scope_prefix}{name}"),
            version: version.map(str::to_string),
        })
    }

    pub(crate) fn install_arg(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{version}", self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.install_arg())
    }
}

#[derive(Deserialize)]
struct SearchHit {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// `npm search --json` prints an array of `{ name, version, ... }`.
pub(crate) fn parse_search_output(stdout: &str) -> Result<Vec<PackageSpec>, RunnerError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(stdout.trim()).map_err(|e| RunnerError::Output {
            what: "npm search",
            message: e.to_string(),
        })?;
    Ok(hits
        .into_iter()
        .map(|hit| PackageSpec {
            name: hit.name,
            version: hit.version,
        })
        .collect())
}

/// First occurrence of each name wins; names with no adapter are dropped.
pub(crate) fn select_candidates(found: impl IntoIterator<Item = PackageSpec>) -> Vec<PackageSpec> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|spec| adapter_for(&spec.name).is_some())
        .filter(|spec| seen.insert(spec.name.clone()))
        .collect()
}

/// An SDK installed into its own scratch prefix; dropping it removes the
/// directory.
#[derive(Debug)]
pub(crate) struct InstalledSdk {
    pub(crate) spec: PackageSpec,
    pub(crate) version: String,
    dir: TempDir,
}

impl InstalledSdk {
    pub(crate) fn new(spec: PackageSpec, version: String, dir: TempDir) -> Self {
        Self { spec, version, dir }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Everything the orchestrator needs from the JavaScript world.
pub(crate) trait SdkHost {
    fn search(&self, keyword: &str, limit: usize) -> Result<Vec<PackageSpec>, RunnerError>;

    fn install(&self, spec: &PackageSpec) -> Result<InstalledSdk, RunnerError>;

    fn extract(&self, sdk: &InstalledSdk, script: &'static str) -> Result<Value, RunnerError>;
}

#[derive(Clone, Debug)]
pub(crate) struct NpmHost {
    pub(crate) npm_bin: String,
    pub(crate) node_bin: String,
    pub(crate) timeout: Duration,
}

impl NpmHost {
    fn scratch(&self, label: &str) -> Result<TempDir, RunnerError> {
        tempfile::Builder::new()
            .prefix(&format!("ksv-{label}-"))
            .tempdir()
            .map_err(|e| RunnerError::io("create scratch dir", e))
    }
}

impl SdkHost for NpmHost {
    fn search(&self, keyword: &str, limit: usize) -> Result<Vec<PackageSpec>, RunnerError> {
        let scratch = self.scratch("search")?;
        let mut cmd = Command::new(&self.npm_bin);
        cmd.args(["search", "--json", "--searchlimit"])
            .arg(limit.to_string())
            .arg(keyword);
        let stdout = run_captured(cmd, &self.npm_bin, scratch.path(), self.timeout)?
            .into_success(&self.npm_bin)?;
        let found = parse_search_output(&stdout)?;
        tracing::debug!(keyword, hits = found.len(), "npm search finished");
        Ok(found)
    }

    fn install(&self, spec: &PackageSpec) -> Result<InstalledSdk, RunnerError> {
        let dir = self.scratch("sdk")?;
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, "{ \"private\": true }\n")
            .map_err(|e| RunnerError::io(format!("write {}", manifest.display()), e))?;

        let mut cmd = Command::new(&self.npm_bin);
        cmd.args(["install", "--no-audit", "--no-fund", "--ignore-scripts", "--prefix"])
            .arg(dir.path())
            .arg(spec.install_arg())
            .current_dir(dir.path());
        let logs = dir.path().join(".ksv");
        run_captured(cmd, &self.npm_bin, &logs, self.timeout)?.into_success(&self.npm_bin)?;

        let version = installed_version(dir.path(), &spec.name)?;
        tracing::info!(package = %spec.name, %version, "sdk installed");
        Ok(InstalledSdk::new(spec.clone(), version, dir))
    }

    fn extract(&self, sdk: &InstalledSdk, script: &'static str) -> Result<Value, RunnerError> {
        let mut cmd = Command::new(&self.node_bin);
        cmd.arg("-e")
            .arg(script)
            .env("KSV_SDK_DIR", sdk.root())
            .env("KSV_SDK_PACKAGE", &sdk.spec.name)
            .current_dir(sdk.root());
        let logs = sdk.root().join(".ksv");
        let stdout = run_captured(cmd, &self.node_bin, &logs, self.timeout)?
            .into_success(&self.node_bin)?;
        serde_json::from_str(stdout.trim()).map_err(|e| RunnerError::Output {
            what: "extraction",
            message: e.to_string(),
        })
    }
}

fn installed_version(prefix: &Path, package: &str) -> Result<String, RunnerError> {
    let manifest = prefix.join("node_modules").join(package).join("package.json");
    let text = std::fs::read_to_string(&manifest)
        .map_err(|e| RunnerError::io(format!("read {}", manifest.display()), e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| RunnerError::Output {
        what: "package.json",
        message: e.to_string(),
    })?;
    value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RunnerError::Output {
            what: "package.json",
            message: format!("{} has no version", manifest.display()),
        })
}
