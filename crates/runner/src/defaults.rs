#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_DATASET_DIRNAME: &str = "deployments";
pub(crate) const DEFAULT_OUT_DIRNAME: &str = "reports";
pub(crate) const DEFAULT_KEYWORDS: &[&str] = &["ckb", "nervos"];
pub(crate) const DEFAULT_SEARCH_LIMIT: usize = 50;
pub(crate) const DEFAULT_TIMEOUT_S: u64 = 600;

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn base_dir(start: &Path) -> PathBuf {
    find_repo_root(start).unwrap_or_else(|| start.to_path_buf())
}

/// `<repo root>/deployments`, or `<start>/deployments` outside a repository,
/// so running from a subdirectory still finds the dataset.
pub(crate) fn default_dataset_dir_from_start(start: &Path) -> PathBuf {
    base_dir(start).join(DEFAULT_DATASET_DIRNAME)
}

pub(crate) fn default_out_dir_from_start(start: &Path) -> PathBuf {
    base_dir(start).join(DEFAULT_OUT_DIRNAME)
}
