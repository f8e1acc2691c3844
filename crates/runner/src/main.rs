#![forbid(unsafe_code)]

mod adapters;
mod bin_detect;
mod defaults;
mod error;
mod inputs;
mod npm;
mod orchestrator;
mod process;
mod report;

use defaults::*;
use error::RunnerError;
use ksv_core::{Validator, ValidatorOptions};
use ksv_storage::{DirectorySource, ReferenceStore};
use npm::{NpmHost, PackageSpec, SdkHost};
use orchestrator::CheckSettings;
use report::RunReport;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Run,
    Discover,
    Validate { descriptors: PathBuf },
}

#[derive(Debug)]
struct RunnerConfig {
    command: Command,
    dataset_dir: PathBuf,
    out_dir: PathBuf,
    npm_bin: String,
    node_bin: String,
    keywords: Vec<String>,
    search_limit: usize,
    packages: Vec<PackageSpec>,
    strict_hash_type: bool,
    workers: usize,
    timeout_s: u64,
}

impl RunnerConfig {
    fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            options: ValidatorOptions {
                strict_data_hash_type: self.strict_hash_type,
            },
            workers: self.workers,
        }
    }
}

fn usage() -> &'static str {
    "ksv_runner: check SDK known-script metadata against the deployment dataset\n\n\
USAGE:\n\
  ksv_runner [run] [--package NAME[@VERSION]]... [--keyword KW]...\n\
             [--search-limit N] [--out-dir DIR]\n\
  ksv_runner discover [--keyword KW]... [--search-limit N]\n\
  ksv_runner validate --descriptors FILE\n\n\
COMMON:\n\
  --dataset-dir DIR     deployment records (KSV_DATASET_DIR, default <repo>/deployments)\n\
  --out-dir DIR         report directory (KSV_OUT_DIR, default <repo>/reports)\n\
  --npm-bin PATH        (KSV_NPM_BIN, default npm)\n\
  --node-bin PATH       (KSV_NODE_BIN, default node)\n\
  --search-limit N      (KSV_SEARCH_LIMIT, default 50)\n\
  --keyword KW          repeatable (KSV_KEYWORDS=a,b; default ckb,nervos)\n\
  --strict-hash-type    compare data hash types against the record's own\n\
  --workers N           validation threads (KSV_WORKERS)\n\
  --timeout-s S         per npm/node invocation (KSV_TIMEOUT_S, default 600)\n\n\
EXIT CODES:\n\
  0 everything valid, 1 validation failures or SDK errors, 2 usage or setup error\n\
  Logs go to stderr; filter with KSV_LOG, JSON with KSV_LOG_JSON=1.\n"
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> bool {
    lookup(name).is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

fn parse_args() -> Result<Option<RunnerConfig>, String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| format!("cannot read current dir: {e}"))?;
    parse_args_from(&args, &env_var, &cwd)
}

/// `Ok(None)` means `--help` was requested.
fn parse_args_from(
    args: &[String],
    env: &dyn Fn(&str) -> Option<String>,
    cwd: &Path,
) -> Result<Option<RunnerConfig>, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(None);
    }

    let mut dataset_dir: Option<PathBuf> = env("KSV_DATASET_DIR").map(PathBuf::from);
    let mut out_dir: Option<PathBuf> = env("KSV_OUT_DIR").map(PathBuf::from);
    let mut npm_bin: String = env("KSV_NPM_BIN").unwrap_or_else(|| "npm".to_string());
    let mut node_bin: String = env("KSV_NODE_BIN").unwrap_or_else(|| "node".to_string());
    let mut search_limit: usize = match env("KSV_SEARCH_LIMIT") {
        Some(v) => v.parse().map_err(|_| "KSV_SEARCH_LIMIT must be an integer")?,
        None => DEFAULT_SEARCH_LIMIT,
    };
    let env_keywords = env("KSV_KEYWORDS").map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });
    let mut keywords: Vec<String> = Vec::new();
    let mut packages: Vec<PackageSpec> = Vec::new();
    let mut descriptors: Option<PathBuf> = None;
    let mut strict_hash_type = env_flag(env, "KSV_STRICT_HASH_TYPE");
    let mut workers: usize = match env("KSV_WORKERS") {
        Some(v) => v.parse().map_err(|_| "KSV_WORKERS must be an integer")?,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    let mut timeout_s: u64 = match env("KSV_TIMEOUT_S") {
        Some(v) => v.parse().map_err(|_| "KSV_TIMEOUT_S must be an integer (seconds)")?,
        None => DEFAULT_TIMEOUT_S,
    };
    let mut command_word: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--dataset-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--dataset-dir requires DIR")?;
                dataset_dir = Some(PathBuf::from(v));
            }
            "--out-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--out-dir requires DIR")?;
                out_dir = Some(PathBuf::from(v));
            }
            "--npm-bin" => {
                i += 1;
                let v = args.get(i).ok_or("--npm-bin requires PATH")?;
                npm_bin = v.to_string();
            }
            "--node-bin" => {
                i += 1;
                let v = args.get(i).ok_or("--node-bin requires PATH")?;
                node_bin = v.to_string();
            }
            "--keyword" => {
                i += 1;
                let v = args.get(i).ok_or("--keyword requires KW")?;
                keywords.push(v.trim().to_string());
            }
            "--search-limit" => {
                i += 1;
                let v = args.get(i).ok_or("--search-limit requires N")?;
                search_limit = v
                    .parse::<usize>()
                    .map_err(|_| "--search-limit must be an integer")?;
            }
            "--package" => {
                i += 1;
                let v = args.get(i).ok_or("--package requires NAME[@VERSION]")?;
                packages.push(PackageSpec::parse(v)?);
            }
            "--descriptors" => {
                i += 1;
                let v = args.get(i).ok_or("--descriptors requires FILE")?;
                descriptors = Some(PathBuf::from(v));
            }
            "--strict-hash-type" => strict_hash_type = true,
            "--workers" => {
                i += 1;
                let v = args.get(i).ok_or("--workers requires N")?;
                workers = v
                    .parse::<usize>()
                    .map_err(|_| "--workers must be an integer")?;
            }
            "--timeout-s" => {
                i += 1;
                let v = args.get(i).ok_or("--timeout-s requires S")?;
                timeout_s = v
                    .parse::<u64>()
                    .map_err(|_| "--timeout-s must be an integer (seconds)")?;
            }
            word @ ("run" | "discover" | "validate") if i == 0 => {
                command_word = Some(word.to_string());
            }
            other => return Err(format!("Unknown arg: {other}\n\n{}", usage())),
        }
        i += 1;
    }

    let command = match command_word.as_deref() {
        None | Some("run") => Command::Run,
        Some("discover") => Command::Discover,
        _ => Command::Validate {
            descriptors: descriptors
                .take()
                .ok_or("validate requires --descriptors FILE")?,
        },
    };
    if descriptors.is_some() {
        return Err("--descriptors only applies to the validate command".to_string());
    }
    if !packages.is_empty() && command != Command::Run {
        return Err("--package only applies to the run command".to_string());
    }
    if search_limit == 0 {
        return Err("--search-limit must be at least 1".to_string());
    }
    if timeout_s == 0 {
        return Err("--timeout-s must be at least 1".to_string());
    }
    if keywords.is_empty() {
        keywords = env_keywords
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect());
    }

    Ok(Some(RunnerConfig {
        command,
        dataset_dir: dataset_dir.unwrap_or_else(|| default_dataset_dir_from_start(cwd)),
        out_dir: out_dir.unwrap_or_else(|| default_out_dir_from_start(cwd)),
        npm_bin,
        node_bin,
        keywords,
        search_limit,
        packages,
        strict_hash_type,
        workers: workers.max(1),
        timeout_s,
    }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KSV_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = env_flag(&env_var, "KSV_LOG_JSON");
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .init();
    }
}

fn load_store(cfg: &RunnerConfig) -> Result<ReferenceStore, RunnerError> {
    let store = ReferenceStore::load(&DirectorySource::new(&cfg.dataset_dir))?;
    if store.is_empty() {
        tracing::warn!(dataset_dir = %cfg.dataset_dir.display(), "reference dataset is empty");
    }
    Ok(store)
}

fn npm_host(cfg: &RunnerConfig, need_node: bool) -> Result<NpmHost, RunnerError> {
    let npm_bin = bin_detect::resolve_bin(&cfg.npm_bin)
        .map_err(|message| RunnerError::Executable { what: "npm", message })?;
    let node_bin = if need_node {
        bin_detect::resolve_bin(&cfg.node_bin)
            .map_err(|message| RunnerError::Executable { what: "node", message })?
    } else {
        cfg.node_bin.clone()
    };
    Ok(NpmHost {
        npm_bin,
        node_bin,
        timeout: Duration::from_secs(cfg.timeout_s),
    })
}

fn packages_to_check(cfg: &RunnerConfig, host: &dyn SdkHost) -> Result<Vec<PackageSpec>, RunnerError> {
    if cfg.packages.is_empty() {
        orchestrator::discover(host, &cfg.keywords, cfg.search_limit)
    } else {
        Ok(cfg.packages.clone())
    }
}

/// `Ok(true)` when nothing failed.
fn execute(cfg: &RunnerConfig) -> Result<bool, RunnerError> {
    match &cfg.command {
        Command::Validate { descriptors } => {
            let store = load_store(cfg)?;
            let inputs = inputs::read_descriptor_file(descriptors)?;
            let results = Validator::with_options(&store, cfg.check_settings().options)
                .validate_all_parallel(&inputs, cfg.workers);
            let text = serde_json::to_string_pretty(&results).map_err(|e| RunnerError::Output {
                what: "results",
                message: e.to_string(),
            })?;
            println!("{text}");
            let failed = results.iter().filter(|r| !r.is_valid()).count();
            tracing::info!(checked = results.len(), failed, "descriptor file validated");
            Ok(failed == 0)
        }
        Command::Discover => {
            let host = npm_host(cfg, false)?;
            for spec in orchestrator::discover(&host, &cfg.keywords, cfg.search_limit)? {
                println!("{spec}");
            }
            Ok(true)
        }
        Command::Run => {
            let store = load_store(cfg)?;
            let host = npm_host(cfg, true)?;
            let packages = packages_to_check(cfg, &host)?;
            if packages.is_empty() {
                tracing::warn!("no sdk packages to check");
            }
            let sdks = orchestrator::run_packages(&host, &store, &packages, cfg.check_settings());
            let report = RunReport::new(
                OffsetDateTime::now_utc(),
                &cfg.dataset_dir,
                store.fingerprint(),
                sdks,
            )?;
            let path = report.write_to(&cfg.out_dir)?;
            print!("{}", report.summary());
            tracing::info!(report = %path.display(), clean = report.is_clean(), "run finished");
            Ok(report.is_clean())
        }
    }
}

fn main() -> ExitCode {
    let cfg = match parse_args() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            print!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };
    init_tracing();
    tracing::debug!(?cfg, "configuration");

    match execute(&cfg) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            tracing::error!(error = %err, "run aborted");
            eprintln!("ksv_runner: {err}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests;
