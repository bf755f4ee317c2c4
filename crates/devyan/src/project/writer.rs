use crate::prelude::*;
use devyan_core::project::{GenerationEvent, ResolvedFile, WrittenFile};
use std::path::Path;

/// Write every resolved file into `project_dir`, creating it first.
///
/// Bodies are written exactly as resolved.
pub async fn write_project(
    project_dir: &Path,
    files: &[ResolvedFile],
    on_event: &mut impl FnMut(GenerationEvent),
) -> Result<Vec<WrittenFile>> {
    tokio::fs::create_dir_all(project_dir)
        .await
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let mut written = Vec::with_capacity(files.len());

    for file in files {
        let role = file.role();
        let path = project_dir.join(role.file_name());

        tokio::fs::write(&path, file.body())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let bytes = file.body().len();
        log::debug!("Wrote {} ({} bytes)", path.display(), bytes);
        on_event(GenerationEvent::Written { role, bytes });

        written.push(WrittenFile {
            role,
            file_name: role.file_name().to_string(),
            bytes,
            origin: file.origin().clone(),
        });
    }

    Ok(written)
}
