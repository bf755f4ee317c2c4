//! Summary of a finished project write.

use serde::Serialize;

use super::pipeline::FileOrigin;
use super::types::FileRole;

/// One file as it was written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub role: FileRole,
    pub file_name: String,
    pub bytes: usize,
    #[serde(flatten)]
    pub origin: FileOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectReport {
    pub project_dir: String,
    pub files: Vec<WrittenFile>,
    pub total_bytes: usize,
    /// Files written out of the four expected, as a percentage.
    pub success_rate: f64,
    pub fallbacks: usize,
    pub elapsed_ms: u64,
}

impl ProjectReport {
    pub fn new(project_dir: impl Into<String>, files: Vec<WrittenFile>, elapsed_ms: u64) -> Self {
        let written = FileRole::ALL
            .iter()
            .filter(|role| files.iter().any(|f| f.role == **role && f.bytes > 0))
            .count();

        Self {
            project_dir: project_dir.into(),
            total_bytes: files.iter().map(|f| f.bytes).sum(),
            success_rate: written as f64 * 100.0 / FileRole::ALL.len() as f64,
            fallbacks: files
                .iter()
                .filter(|f| matches!(f.origin, FileOrigin::Fallback { .. }))
                .count(),
            files,
            elapsed_ms,
        }
    }

    /// Every expected file was written with content.
    pub fn is_complete(&self) -> bool {
        self.success_rate >= 100.0
    }
}
