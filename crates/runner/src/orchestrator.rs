#![forbid(unsafe_code)]

use crate::adapters::adapter_for;
use crate::error::RunnerError;
use crate::npm::{PackageSpec, SdkHost, select_candidates};
use crate::report::SdkReport;
use ksv_core::{ReferenceLookup, Validator, ValidatorOptions};

#[derive(Clone, Copy, Debug)]
pub(crate) struct CheckSettings {
    pub(crate) options: ValidatorOptions,
    pub(crate) workers: usize,
}

/// Runs one search per keyword. A failing keyword is logged and skipped;
/// only when every search fails is the run aborted.
pub(crate) fn discover(
    host: &dyn SdkHost,
    keywords: &[String],
    limit: usize,
) -> Result<Vec<PackageSpec>, RunnerError> {
    let mut found = Vec::new();
    let mut last_err = None;
    let mut any_ok = false;
    for keyword in keywords {
        match host.search(keyword, limit) {
            Ok(hits) => {
                any_ok = true;
                found.extend(hits);
            }
            Err(err) => {
                tracing::warn!(keyword = %keyword, error = %err, "npm search failed");
                last_err = Some(err);
            }
        }
    }
    if let (false, Some(err)) = (any_ok, last_err) {
        return Err(err);
    }
    let candidates = select_candidates(found);
    tracing::info!(
        keywords = keywords.len(),
        candidates = candidates.len(),
        "sdk discovery finished"
    );
    Ok(candidates)
}

/// Install, extract and validate one package. Never fails: anything that
/// goes wrong lands in the report's `error`.
pub(crate) fn check_package<R>(
    host: &dyn SdkHost,
    reference: &R,
    spec: &PackageSpec,
    settings: CheckSettings,
) -> SdkReport
where
    R: ReferenceLookup + Sync + ?Sized,
{
    let Some(adapter) = adapter_for(&spec.name) else {
        let err = RunnerError::NoAdapter(spec.name.clone());
        tracing::warn!(package = %spec.name, "no adapter for package");
        return SdkReport::failure(&spec.name, spec.version.as_deref(), None, &err);
    };
    let family = adapter.family();

    let sdk = match host.install(spec) {
        Ok(sdk) => sdk,
        Err(err) => {
            tracing::warn!(package = %spec.name, error = %err, "sdk install failed");
            return SdkReport::failure(&spec.name, spec.version.as_deref(), Some(family), &err);
        }
    };

    let extraction = host
        .extract(&sdk, adapter.extraction_script())
        .and_then(|output| adapter.parse_extraction(&output).map_err(RunnerError::from));
    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(err) => {
            tracing::warn!(package = %spec.name, version = %sdk.version, error = %err, "sdk extraction failed");
            return SdkReport::failure(&spec.name, Some(&sdk.version), Some(family), &err);
        }
    };

    let validator = Validator::with_options(reference, settings.options);
    let results = validator.validate_all_parallel(&extraction.inputs, settings.workers);
    let report = SdkReport::from_results(
        &spec.name,
        &sdk.version,
        family,
        results,
        extraction.skipped,
        extraction.rejected,
    );
    tracing::info!(
        package = %report.package,
        version = %sdk.version,
        family = family.as_str(),
        passed = report.passed,
        failed = report.failed,
        skipped = report.skipped.len(),
        rejected = report.rejected.len(),
        "sdk validated"
    );
    report
}

/// Packages are processed one after another; each install is dropped
/// (and its directory removed) before the next starts.
pub(crate) fn run_packages<R>(
    host: &dyn SdkHost,
    reference: &R,
    packages: &[PackageSpec],
    settings: CheckSettings,
) -> Vec<SdkReport>
where
    R: ReferenceLookup + Sync + ?Sized,
{
    packages
        .iter()
        .map(|spec| check_package(host, reference, spec, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npm::InstalledSdk;
    use ksv_storage::{InlineSource, ReferenceStore};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::HashMap;

    const XUDT: &str = r#"{
        "name": "xudt",
        "testnet": {
            "data": { "codeHash": "0x25c2", "hashType": "data1" },
            "cellDeps": [{ "depType": "code", "outPoint": { "txHash": "0xbf6f", "index": "0x0" } }]
        }
    }"#;

    #[derive(Default)]
    struct FakeHost {
        searches: HashMap<String, Result<Vec<PackageSpec>, ()>>,
        outputs: HashMap<String, Value>,
        installed: RefCell<Vec<String>>,
    }

    impl SdkHost for FakeHost {
        fn search(&self, keyword: &str, _limit: usize) -> Result<Vec<PackageSpec>, RunnerError> {
            match self.searches.get(keyword) {
                Some(Ok(hits)) => Ok(hits.clone()),
                _ => Err(RunnerError::Output {
                    what: "npm search",
                    message: format!("no fixture for {keyword}"),
                }),
            }
        }

        fn install(&self, spec: &PackageSpec) -> Result<InstalledSdk, RunnerError> {
            self.installed.borrow_mut().push(spec.name.clone());
            if !self.outputs.contains_key(&spec.name) {
                return Err(RunnerError::ProcessFailed {
                    program: "npm".to_string(),
                    code: Some(1),
                    stderr: "E404".to_string(),
                });
            }
            let dir = tempfile::tempdir().map_err(|e| RunnerError::io("tempdir", e))?;
            Ok(InstalledSdk::new(spec.clone(), "9.9.9".to_string(), dir))
        }

        fn extract(&self, sdk: &InstalledSdk, _script: &'static str) -> Result<Value, RunnerError> {
            Ok(self.outputs[&sdk.spec.name].clone())
        }
    }

    fn spec(raw: &str) -> PackageSpec {
        PackageSpec::parse(raw).expect("spec")
    }

    fn store() -> ReferenceStore {
        ReferenceStore::load(&InlineSource::new().with("xudt.json", XUDT)).expect("load")
    }

    fn settings() -> CheckSettings {
        CheckSettings {
            options: ValidatorOptions::default(),
            workers: 2,
        }
    }

    #[test]
    fn discover_merges_keywords_and_tolerates_one_failure() {
        let mut host = FakeHost::default();
        host.searches.insert(
            "ckb".to_string(),
            Ok(vec![spec("@ckb-ccc/core@1.0.0"), spec("@ckb-lumos/base@0.1.0")]),
        );
        host.searches.insert(
            "nervos".to_string(),
            Ok(vec![spec("@ckb-ccc/core@1.0.0"), spec("@ckb-lumos/lumos@0.23.0")]),
        );
        let keywords = ["ckb", "nervos", "broken"].map(String::from);
        let found = discover(&host, &keywords, 20).expect("discover");
        assert_eq!(found, vec![spec("@ckb-ccc/core@1.0.0"), spec("@ckb-lumos/lumos@0.23.0")]);

        let err = discover(&host, &["broken".to_string()], 20).unwrap_err();
        assert!(matches!(err, RunnerError::Output { .. }), "{err}");
    }

    #[test]
    fn package_results_are_collected_per_sdk() {
        let mut host = FakeHost::default();
        host.outputs.insert(
            "@ckb-ccc/core".to_string(),
            json!({ "scripts": [
                {
                    "name": "XUdt", "network": "testnet", "codeHash": "0x25C2", "hashType": "data1",
                    "cellDeps": [{ "depType": "code", "outPoint": { "txHash": "0xbf6f", "index": 0 } }]
                },
                { "name": "Spore", "network": "testnet", "codeHash": "0x1", "hashType": "data1" }
            ]}),
        );
        host.outputs.insert("@ckb-lumos/lumos".to_string(), json!({ "nope": true }));

        let packages = [
            spec("@ckb-ccc/core"),
            spec("@ckb-lumos/lumos"),
            spec("@ckb-lumos/config-manager"),
            spec("left-pad"),
        ];
        let reports = run_packages(&host, &store(), &packages, settings());
        assert_eq!(reports.len(), 4);

        let ccc = &reports[0];
        assert_eq!((ccc.passed, ccc.failed), (1, 1));
        assert_eq!(ccc.version.as_deref(), Some("9.9.9"));
        assert!(ccc.error.is_none());
        assert_eq!(
            ccc.results[1].errors(),
            ["Script 'spore' not found in deployments".to_string()]
        );

        let bad_shape = reports[1].error.as_deref().expect("shape error");
        assert!(bad_shape.starts_with("lumos output:"), "{bad_shape}");

        let not_installed = reports[2].error.as_deref().expect("install error");
        assert_eq!(not_installed, "npm exited with 1: E404");

        assert_eq!(
            reports[3].error.as_deref(),
            Some("no adapter supports package left-pad")
        );
        assert_eq!(
            host.installed.borrow().as_slice(),
            ["@ckb-ccc/core", "@ckb-lumos/lumos", "@ckb-lumos/config-manager"]
        );
    }

    #[test]
    fn one_unrecognized_entry_does_not_discard_the_rest() {
        let mut host = FakeHost::default();
        host.outputs.insert(
            "@ckb-ccc/core".to_string(),
            json!({ "scripts": [
                {
                    "name": "XUdt", "network": "testnet", "codeHash": "0x25c2", "hashType": "data1",
                    "cellDeps": [{ "depType": "code", "outPoint": { "txHash": "0xbf6f", "index": "0x0" } }]
                },
                { "name": "Spore", "network": "testnet", "codeHash": "0x1", "hashType": "Data1" }
            ]}),
        );

        let report = check_package(&host, &store(), &spec("@ckb-ccc/core"), settings());
        assert!(report.error.is_none(), "{:?}", report.error);
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].is_valid(), "{:?}", report.results[0].errors());
        assert_eq!(
            report.rejected,
            vec!["ccc script spore: unrecognized hashType \"Data1\"".to_string()]
        );
        assert_eq!((report.passed, report.failed), (1, 1));
    }
}
