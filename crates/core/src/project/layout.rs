//! Where a generated project lands on disk.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Output root used when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "projects";

const SLUG_WORDS: usize = 3;
const SLUG_MAX_CHARS: usize = 30;

/// Directory-safe name derived from the request description.
///
/// Takes the first three words, keeps the purely alphanumeric ones and joins
/// them with underscores. Falls back to `project`.
pub fn project_slug(description: &str) -> String {
    let slug = description
        .to_lowercase()
        .split_whitespace()
        .take(SLUG_WORDS)
        .filter(|word| word.chars().all(char::is_alphanumeric))
        .collect::<Vec<_>>()
        .join("_");

    let slug: String = slug.chars().take(SLUG_MAX_CHARS).collect();

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// `<slug>_<YYYYmmdd_HHMMSS>`
pub fn project_dir_name(description: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{}_{}",
        project_slug(description),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

pub fn project_path(root: &Path, description: &str, timestamp: NaiveDateTime) -> PathBuf {
    root.join(project_dir_name(description, timestamp))
}
