#![forbid(unsafe_code)]

use super::LoadError;
use std::path::PathBuf;

/// One raw dataset document plus where it came from (used in errors).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    pub origin: String,
    pub text: String,
}

/// Where reference records come from. Documents are returned in the order
/// they should be applied; later duplicates win.
pub trait DeploymentSource {
    fn documents(&self) -> Result<Vec<SourceDocument>, LoadError>;
}

/// Every `*.json` file directly inside one directory, sorted by file name.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn json_files(&self) -> Result<Vec<PathBuf>, LoadError> {
        let io_err = |source| LoadError::Io {
            origin: self.dir.display().to_string(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DeploymentSource for DirectorySource {
    fn documents(&self) -> Result<Vec<SourceDocument>, LoadError> {
        self.json_files()?
            .into_iter()
            .map(|path| {
                let origin = path.display().to_string();
                match std::fs::read_to_string(&path) {
                    Ok(text) => Ok(SourceDocument { origin, text }),
                    Err(source) => Err(LoadError::Io { origin, source }),
                }
            })
            .collect()
    }
}

/// In-memory documents, e.g. a dataset embedded in a test.
#[derive(Clone, Debug, Default)]
pub struct InlineSource {
    docs: Vec<SourceDocument>,
}

impl InlineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, origin: impl Into<String>, text: impl Into<String>) -> Self {
        self.docs.push(SourceDocument {
            origin: origin.into(),
            text: text.into(),
        });
        self
    }
}

impl DeploymentSource for InlineSource {
    fn documents(&self) -> Result<Vec<SourceDocument>, LoadError> {
        Ok(self.docs.clone())
    }
}
