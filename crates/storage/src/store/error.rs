#![forbid(unsafe_code)]

use thiserror::Error;

/// Failures while loading the reference dataset. All of them abort the load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed deployment record in {origin}: {message}")]
    Malformed { origin: String, message: String },
    #[error("deployment record in {origin} has an empty name")]
    MissingName { origin: String },
}

impl LoadError {
    pub fn origin(&self) -> &str {
        match self {
            Self::Io { origin, .. } | Self::Malformed { origin, .. } | Self::MissingName { origin } => {
                origin
            }
        }
    }
}
