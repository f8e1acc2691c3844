#![forbid(unsafe_code)]

use crate::error::RunnerError;
use std::fs::File;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STDERR_TAIL_CHARS: usize = 2000;

#[derive(Debug)]
pub(crate) struct CapturedOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl CapturedOutput {
    pub(crate) fn into_success(self, program: &str) -> Result<String, RunnerError> {
        if self.status.success() {
            return Ok(self.stdout);
        }
        Err(RunnerError::ProcessFailed {
            program: program.to_string(),
            code: self.status.code(),
            stderr: stderr_tail(&self.stderr),
        })
    }
}

/// Runs `cmd` to completion with stdout/stderr redirected to files under
/// `scratch` (no pipe buffers to fill up), killing it after `timeout`.
pub(crate) fn run_captured(
    mut cmd: Command,
    program: &str,
    scratch: &Path,
    timeout: Duration,
) -> Result<CapturedOutput, RunnerError> {
    std::fs::create_dir_all(scratch)
        .map_err(|e| RunnerError::io(format!("create scratch dir {}", scratch.display()), e))?;
    let stdout_path = scratch.join(format!("{}.stdout", file_stem(program)));
    let stderr_path = scratch.join(format!("{}.stderr", file_stem(program)));
    let stdout_file = File::create(&stdout_path)
        .map_err(|e| RunnerError::io(format!("create {}", stdout_path.display()), e))?;
    let stderr_file = File::create(&stderr_path)
        .map_err(|e| RunnerError::io(format!("create {}", stderr_path.display()), e))?;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => return Err(RunnerError::io(format!("wait for {program}"), e)),
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RunnerError::Timeout {
                program: program.to_string(),
                after_s: timeout.as_secs(),
            });
        }
        sleep(POLL_INTERVAL);
    };

    let read = |path: &Path| {
        std::fs::read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| RunnerError::io(format!("read {}", path.display()), e))
    };
    Ok(CapturedOutput {
        status,
        stdout: read(&stdout_path)?,
        stderr: read(&stderr_path)?,
    })
}

fn file_stem(program: &str) -> String {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("proc")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let tail = trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect::<String>();
    format!("…{tail}")
}
