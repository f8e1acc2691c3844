#![forbid(unsafe_code)]

use crate::adapters::SdkFamily;
use crate::error::RunnerError;
use ksv_core::ValidationResult;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) const LATEST_REPORT: &str = "latest.json";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SdkReport {
    pub(crate) package: String,
    pub(crate) version: Option<String>,
    pub(crate) family: Option<SdkFamily>,
    pub(crate) passed: usize,
    pub(crate) failed: usize,
    pub(crate) results: Vec<ValidationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) skipped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) rejected: Vec<String>,
    pub(crate) error: Option<String>,
}

impl SdkReport {
    pub(crate) fn from_results(
        package: &str,
        version: &str,
        family: SdkFamily,
        results: Vec<ValidationResult>,
        skipped: Vec<String>,
        rejected: Vec<String>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.is_valid()).count();
        Self {
            package: package.to_string(),
            version: Some(version.to_string()),
            family: Some(family),
            passed,
            // A rejected entry is a descriptor the SDK got wrong.
            failed: results.len() - passed + rejected.len(),
            results,
            skipped,
            rejected,
            error: None,
        }
    }

    pub(crate) fn failure(
        package: &str,
        version: Option<&str>,
        family: Option<SdkFamily>,
        error: &RunnerError,
    ) -> Self {
        Self {
            package: package.to_string(),
            version: version.map(str::to_string),
            family,
            passed: 0,
            failed: 0,
            results: Vec::new(),
            skipped: Vec::new(),
            rejected: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Totals {
    pub(crate) sdks: usize,
    pub(crate) sdk_errors: usize,
    pub(crate) passed: usize,
    pub(crate) failed: usize,
}

impl Totals {
    fn of(sdks: &[SdkReport]) -> Self {
        sdks.iter().fold(
            Self {
                sdks: sdks.len(),
                ..Self::default()
            },
            |acc, sdk| Self {
                sdk_errors: acc.sdk_errors + usize::from(sdk.error.is_some()),
                passed: acc.passed + sdk.passed,
                failed: acc.failed + sdk.failed,
                ..acc
            },
        )
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReport {
    pub(crate) generated_at: String,
    pub(crate) dataset_dir: String,
    pub(crate) dataset_fingerprint: Option<String>,
    pub(crate) sdks: Vec<SdkReport>,
    pub(crate) totals: Totals,
    #[serde(skip)]
    date: String,
}

impl RunReport {
    pub(crate) fn new(
        generated_at: OffsetDateTime,
        dataset_dir: &Path,
        dataset_fingerprint: Option<&str>,
        sdks: Vec<SdkReport>,
    ) -> Result<Self, RunnerError> {
        let rfc3339 = generated_at.format(&Rfc3339).map_err(|e| RunnerError::Output {
            what: "timestamp",
            message: e.to_string(),
        })?;
        let date = rfc3339.get(..10).unwrap_or(&rfc3339).to_string();
        Ok(Self {
            generated_at: rfc3339,
            dataset_dir: dataset_dir.display().to_string(),
            dataset_fingerprint: dataset_fingerprint.map(str::to_string),
            totals: Totals::of(&sdks),
            sdks,
            date,
        })
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.totals.failed == 0 && self.totals.sdk_errors == 0
    }

    /// Writes `report-<date>.json` and `latest.json`; returns the dated path.
    pub(crate) fn write_to(&self, out_dir: &Path) -> Result<PathBuf, RunnerError> {
        std::fs::create_dir_all(out_dir)
            .map_err(|e| RunnerError::io(format!("create {}", out_dir.display()), e))?;
        let mut text = serde_json::to_string_pretty(self).map_err(|e| RunnerError::Output {
            what: "report",
            message: e.to_string(),
        })?;
        text.push('\n');

        let dated = out_dir.join(format!("report-{}.json", self.date));
        for path in [dated.clone(), out_dir.join(LATEST_REPORT)] {
            std::fs::write(&path, &text)
                .map_err(|e| RunnerError::io(format!("write {}", path.display()), e))?;
        }
        Ok(dated)
    }

    pub(crate) fn summary(&self) -> String {
        let mut out = String::new();
        for sdk in &self.sdks {
            let version = sdk.version.as_deref().unwrap_or("?");
            match &sdk.error {
                Some(error) => {
                    let _ = writeln!(out, "ERROR {}@{version}: {error}", sdk.package);
                }
                None => {
                    let status = if sdk.failed == 0 { "PASS " } else { "FAIL " };
                    let _ = writeln!(
                        out,
                        "{status}{}@{version}: {} passed, {} failed",
                        sdk.package, sdk.passed, sdk.failed
                    );
                    for result in sdk.results.iter().filter(|r| !r.is_valid()) {
                        let _ = writeln!(
                            out,
                            "  {} ({}): {}",
                            result.script_name(),
                            result.network(),
                            result.errors().join("; ")
                        );
                    }
                    for rejected in &sdk.rejected {
                        let _ = writeln!(out, "  rejected: {rejected}");
                    }
                }
            }
        }
        let t = self.totals;
        let _ = writeln!(
            out,
            "{} sdk(s), {} sdk error(s), {} passed, {} failed",
            t.sdks, t.sdk_errors, t.passed, t.failed
        );
        out
    }
}
