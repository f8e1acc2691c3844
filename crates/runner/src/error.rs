#![forbid(unsafe_code)]

use crate::adapters::AdapterError;
use ksv_storage::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {after_s}s")]
    Timeout { program: String, after_s: u64 },
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    ProcessFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unexpected {what} output: {message}")]
    Output { what: &'static str, message: String },
    #[error("cannot use {what}: {message}")]
    Executable { what: &'static str, message: String },
    #[error("no adapter supports package {0}")]
    NoAdapter(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl RunnerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
