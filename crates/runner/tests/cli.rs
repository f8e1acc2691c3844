#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const XUDT_RECORD: &str = r#"{
  "name": "xudt",
  "testnet": {
    "data": { "codeHash": "0x25c2", "hashType": "data1" },
    "cellDeps": [
      { "depType": "code", "outPoint": { "txHash": "0xbf6f", "index": "0x0" } }
    ]
  }
}"#;

fn dataset(root: &Path) -> PathBuf {
    let dir = root.join("deployments");
    std::fs::create_dir_all(&dir).expect("create dataset dir");
    std::fs::write(dir.join("xudt.json"), XUDT_RECORD).expect("write record");
    dir
}

fn runner(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ksv_runner"));
    cmd.current_dir(dir).env("KSV_LOG", "warn").env_remove("KSV_LOG_JSON");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn help_exits_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = runner(dir.path()).arg("--help").output().expect("run --help");
    assert!(output.status.success(), "stderr={}", stderr(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE:"));
}

#[test]
fn usage_errors_exit_two() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = runner(dir.path()).arg("--frobnicate").output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Unknown arg: --frobnicate"));
}

#[test]
fn validate_exit_codes_follow_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dataset(dir.path());
    let descriptors = dir.path().join("descriptors.json");
    let write_descriptor = |code_hash: &str| {
        std::fs::write(
            &descriptors,
            format!(
                r#"[{{ "scriptName": "xudt", "network": "testnet",
                       "descriptor": {{ "codeHash": "{code_hash}", "hashType": "data1",
                         "cellDeps": [{{ "depType": "code", "outPoint": {{ "txHash": "0xbf6f", "index": "0" }} }}] }} }}]"#
            ),
        )
        .expect("write descriptors");
    };
    let validate = || {
        runner(dir.path())
            .arg("validate")
            .arg("--dataset-dir")
            .arg(&data)
            .arg("--descriptors")
            .arg(&descriptors)
            .output()
            .expect("run validate")
    };

    write_descriptor("0x25C2");
    let output = validate();
    assert_eq!(output.status.code(), Some(0), "stderr={}", stderr(&output));
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(results[0]["isValid"], true);

    write_descriptor("0xdead");
    let output = validate();
    assert_eq!(output.status.code(), Some(1));
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(
        results[0]["errors"][0],
        "CodeHash mismatch: expected 0x25c2, got 0xdead"
    );
}

#[test]
fn unreadable_dataset_exits_two() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dataset(dir.path());
    std::fs::write(data.join("broken.json"), "{").expect("write broken record");
    let descriptors = dir.path().join("descriptors.json");
    std::fs::write(&descriptors, "[]").expect("write descriptors");

    let output = runner(dir.path())
        .args(["validate", "--dataset-dir"])
        .arg(&data)
        .arg("--descriptors")
        .arg(&descriptors)
        .output()
        .expect("run validate");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("broken.json"), "stderr={}", stderr(&output));
}

#[cfg(unix)]
mod with_stub_toolchain {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const NPM_STUB: &str = r#"#!/bin/sh
case "$1" in
  search)
    printf '[{"name":"@ckb-ccc/core","version":"1.0.0"},{"name":"left-pad","version":"1.0.0"}]'
    ;;
  install)
    prefix=""
    pkg=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --prefix) shift; prefix="$1" ;;
        install|--*) ;;
        *) pkg="$1" ;;
      esac
      shift
    done
    name="${pkg%@*}"
    mkdir -p "$prefix/node_modules/$name"
    printf '{"name":"%s","version":"1.0.0"}' "$name" > "$prefix/node_modules/$name/package.json"
    ;;
  *)
    echo "unexpected npm call: $*" >&2
    exit 9
    ;;
esac
"#;

    const NODE_STUB: &str = r#"#!/bin/sh
[ -d "$KSV_SDK_DIR/node_modules/$KSV_SDK_PACKAGE" ] || { echo "package not installed" >&2; exit 3; }
printf '{"scripts":[{"name":"XUdt","network":"testnet","codeHash":"0x25C2","hashType":"data1","cellDeps":[{"depType":"code","outPoint":{"txHash":"0xbf6f","index":"0x0"}}]},{"name":"Spore","network":"mainnet","error":"unsupported"}]}'
"#;

    fn executable(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write stub");
        let mut perms = std::fs::metadata(&path).expect("meta").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn run_discovers_installs_validates_and_writes_reports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dataset(dir.path());
        let out = dir.path().join("reports");
        let npm = executable(dir.path(), "npm", NPM_STUB);
        let node = executable(dir.path(), "node", NODE_STUB);

        let output = runner(dir.path())
            .arg("run")
            .arg("--dataset-dir")
            .arg(&data)
            .arg("--out-dir")
            .arg(&out)
            .arg("--npm-bin")
            .arg(&npm)
            .arg("--node-bin")
            .arg(&node)
            .args(["--keyword", "ckb"])
            .output()
            .expect("run");
        assert_eq!(output.status.code(), Some(0), "stderr={}", stderr(&output));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("PASS @ckb-ccc/core@1.0.0: 1 passed, 0 failed"), "{stdout}");

        let latest = std::fs::read_to_string(out.join("latest.json")).expect("latest.json");
        let report: serde_json::Value = serde_json::from_str(&latest).expect("report json");
        assert_eq!(report["totals"]["sdks"], 1);
        assert_eq!(report["totals"]["passed"], 1);
        assert_eq!(report["sdks"][0]["family"], "ccc");
        assert_eq!(report["sdks"][0]["version"], "1.0.0");
        assert_eq!(report["sdks"][0]["skipped"][0], "spore (mainnet): unsupported");
        assert_eq!(report["datasetFingerprint"].as_str().map(str::len), Some(64));

        let dated = std::fs::read_dir(&out)
            .expect("read out dir")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("report-") && name.ends_with(".json"))
            .count();
        assert_eq!(dated, 1);
    }

    #[test]
    fn failing_install_is_reported_and_exits_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dataset(dir.path());
        let out = dir.path().join("reports");
        let npm = executable(dir.path(), "npm", "#!/bin/sh\necho 'E404 not found' >&2\nexit 1\n");
        let node = executable(dir.path(), "node", NODE_STUB);

        let output = runner(dir.path())
            .arg("--dataset-dir")
            .arg(&data)
            .arg("--out-dir")
            .arg(&out)
            .arg("--npm-bin")
            .arg(&npm)
            .arg("--node-bin")
            .arg(&node)
            .args(["--package", "@ckb-lumos/lumos@0.23.0"])
            .output()
            .expect("run");
        assert_eq!(output.status.code(), Some(1), "stderr={}", stderr(&output));

        let latest = std::fs::read_to_string(out.join("latest.json")).expect("latest.json");
        let report: serde_json::Value = serde_json::from_str(&latest).expect("report json");
        assert_eq!(report["totals"]["sdkErrors"], 1);
        let error = report["sdks"][0]["error"].as_str().expect("error text");
        assert!(error.contains("E404 not found"), "{error}");
        assert_eq!(report["sdks"][0]["version"], "0.23.0");
    }
}
