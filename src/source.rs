use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{Snapshot, SnapshotError};

pub const RESPONSE_FILE: &str = "optimize_response.json";
pub const REQUEST_FILE: &str = "optimize_request.json";
pub const CONTROL_FILE: &str = "current_controls.json";

/// Delivers one snapshot per polling cycle.
pub trait SnapshotSource {
    fn fetch(&self) -> Result<Snapshot, SnapshotError>;
}

/// Reads the three documents of a cycle from a directory, as dumped by the
/// control layer.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    dir: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, document: &'static str, file: &str) -> Result<String, SnapshotError> {
        let path = self.dir.join(file);
        debug!(path = %path.display(), document, "reading snapshot document");
        std::fs::read_to_string(&path).map_err(|source| SnapshotError::Io { document, source })
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn fetch(&self) -> Result<Snapshot, SnapshotError> {
        let response = self.read("optimize response", RESPONSE_FILE)?;
        let request = self.read("optimize request", REQUEST_FILE)?;
        let control = self.read("control state", CONTROL_FILE)?;
        Snapshot::from_json(&response, &request, &control)
    }
}
