#![forbid(unsafe_code)]

use super::*;
use std::collections::HashMap;

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn parse_with_env(raw: &[&str], env: &[(&str, &str)]) -> Result<Option<RunnerConfig>, String> {
    let env = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    let lookup = move |name: &str| env.get(name).cloned();
    parse_args_from(&args(raw), &lookup, Path::new("/nonexistent/ksv"))
}

fn parse(raw: &[&str]) -> RunnerConfig {
    parse_with_env(raw, &[])
        .expect("parse")
        .expect("config, not help")
}

#[test]
fn defaults_run_with_builtin_keywords() {
    let cfg = parse(&[]);
    assert_eq!(cfg.command, Command::Run);
    assert_eq!(cfg.keywords, vec!["ckb", "nervos"]);
    assert_eq!(cfg.search_limit, DEFAULT_SEARCH_LIMIT);
    assert_eq!(cfg.npm_bin, "npm");
    assert_eq!(cfg.node_bin, "node");
    assert_eq!(cfg.dataset_dir, Path::new("/nonexistent/ksv/deployments"));
    assert_eq!(cfg.out_dir, Path::new("/nonexistent/ksv/reports"));
    assert!(!cfg.strict_hash_type);
    assert!(cfg.workers >= 1);
}

#[test]
fn help_short_circuits() {
    assert!(parse_with_env(&["run", "--bogus", "--help"], &[]).expect("help").is_none());
}

#[test]
fn flags_override_environment() {
    let env = [
        ("KSV_DATASET_DIR", "/env/data"),
        ("KSV_NPM_BIN", "/env/npm"),
        ("KSV_KEYWORDS", "ckb, ,lumos"),
        ("KSV_SEARCH_LIMIT", "7"),
    ];
    let cfg = parse_with_env(&[], &env).expect("parse").expect("config");
    assert_eq!(cfg.dataset_dir, Path::new("/env/data"));
    assert_eq!(cfg.npm_bin, "/env/npm");
    assert_eq!(cfg.keywords, vec!["ckb", "lumos"]);
    assert_eq!(cfg.search_limit, 7);

    let cfg = parse_with_env(
        &[
            "run",
            "--dataset-dir",
            "/flag/data",
            "--keyword",
            "nervos",
            "--search-limit",
            "3",
            "--strict-hash-type",
            "--workers",
            "0",
        ],
        &env,
    )
    .expect("parse")
    .expect("config");
    assert_eq!(cfg.dataset_dir, Path::new("/flag/data"));
    assert_eq!(cfg.keywords, vec!["nervos"]);
    assert_eq!(cfg.search_limit, 3);
    assert!(cfg.check_settings().options.strict_data_hash_type);
    assert_eq!(cfg.workers, 1);
}

#[test]
fn packages_bypass_discovery() {
    let cfg = parse(&["--package", "@ckb-ccc/core@1.5.0", "--package", "@ckb-lumos/lumos"]);
    assert_eq!(
        cfg.packages,
        vec![
            PackageSpec::parse("@ckb-ccc/core@1.5.0").expect("spec"),
            PackageSpec::parse("@ckb-lumos/lumos").expect("spec"),
        ]
    );
}

#[test]
fn validate_requires_descriptor_file() {
    let cfg = parse(&["validate", "--descriptors", "d.json"]);
    assert_eq!(
        cfg.command,
        Command::Validate {
            descriptors: PathBuf::from("d.json")
        }
    );

    let err = parse_with_env(&["validate"], &[]).err().expect("error");
    assert!(err.contains("--descriptors"), "{err}");

    let err = parse_with_env(&["run", "--descriptors", "d.json"], &[]).err().expect("error");
    assert!(err.contains("validate command"), "{err}");
}

#[test]
fn bad_arguments_are_rejected() {
    let cases: &[&[&str]] = &[
        &["--search-limit", "many"],
        &["--search-limit", "0"],
        &["--timeout-s"],
        &["--package", "@scope"],
        &["discover", "--package", "x"],
        &["run", "discover"],
        &["--frobnicate"],
    ];
    for case in cases {
        assert!(parse_with_env(case, &[]).is_err(), "{case:?} should fail");
    }
}

#[test]
fn validate_command_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dataset = dir.path().join("deployments");
    std::fs::create_dir_all(&dataset).expect("mkdir");
    std::fs::write(
        dataset.join("always_success.json"),
        r#"{ "name": "always_success",
             "mainnet": { "data": { "codeHash": "0xAABB", "hashType": "data" },
                          "cellDeps": [{ "depType": "code", "outPoint": { "txHash": "0x11", "index": "0" } }] } }"#,
    )
    .expect("write record");
    let good = dir.path().join("good.json");
    std::fs::write(
        &good,
        r#"[{ "scriptName": "always_success", "network": "mainnet",
              "descriptor": { "codeHash": "0xaabb", "hashType": "data",
                              "cellDeps": [{ "depType": "code", "outPoint": { "txHash": "0x11", "index": "0x0" } }] } }]"#,
    )
    .expect("write descriptors");
    let bad = dir.path().join("bad.json");
    std::fs::write(
        &bad,
        r#"[{ "scriptName": "foo", "network": "mainnet",
              "descriptor": { "codeHash": "0x1", "hashType": "type" } }]"#,
    )
    .expect("write descriptors");

    let config_for = |file: &Path| {
        parse(&[
            "validate",
            "--dataset-dir",
            dataset.to_str().expect("utf8"),
            "--descriptors",
            file.to_str().expect("utf8"),
        ])
    };
    assert!(execute(&config_for(&good)).expect("execute"));
    assert!(!execute(&config_for(&bad)).expect("execute"));

    let missing = parse(&[
        "validate",
        "--dataset-dir",
        dir.path().join("absent").to_str().expect("utf8"),
        "--descriptors",
        good.to_str().expect("utf8"),
    ]);
    assert!(matches!(execute(&missing), Err(RunnerError::Load(_))));
}
