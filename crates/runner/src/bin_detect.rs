#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn path_contains_separator(cmd: &str) -> bool {
    cmd.contains(std::path::MAIN_SEPARATOR) || cmd.contains('/')
}

pub(crate) fn find_executable_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
        .map(|candidate| candidate.to_string_lossy().to_string())
}

fn find_executable_in_path(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    let dirs = std::env::split_paths(&path_var).collect::<Vec<_>>();
    find_executable_in_dirs(name, &dirs)
}

/// Explicit paths must point at an executable file; bare names must be on
/// `PATH`. Returns what to hand to `Command::new`.
pub(crate) fn resolve_bin(cmd: &str) -> Result<String, String> {
    let trimmed = cmd.trim();
    if trimmed.is_empty() {
        return Err("empty executable name".to_string());
    }
    if path_contains_separator(trimmed) {
        return if is_executable(Path::new(trimmed)) {
            Ok(trimmed.to_string())
        } else {
            Err(format!("{trimmed} is not an executable file"))
        };
    }
    find_executable_in_path(trimmed).ok_or_else(|| format!("{trimmed} not found on PATH"))
}
