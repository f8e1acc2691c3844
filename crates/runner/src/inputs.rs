#![forbid(unsafe_code)]

use crate::error::RunnerError;
use ksv_core::ValidationInput;
use std::path::Path;

/// A descriptor file is a JSON array of `{ scriptName, network, descriptor }`.
pub(crate) fn read_descriptor_file(path: &Path) -> Result<Vec<ValidationInput>, RunnerError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::io(format!("read {}", path.display()), e))?;
    serde_json::from_str(&text).map_err(|e| RunnerError::Output {
        what: "descriptor file",
        message: format!("{}: {e}", path.display()),
    })
}
