pub mod fallback;
pub mod layout;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod sanitize;
pub mod types;
pub mod validate;

pub use fallback::fallback_body;
pub use layout::{project_dir_name, project_path, project_slug, DEFAULT_OUTPUT_DIR};
pub use pipeline::{evaluate_attempt, FileOrigin, GenerationEvent, ResolvedFile, RetryPolicy, Step};
pub use prompt::{build_corrective_prompt, build_prompt, context_source, excerpt, preamble};
pub use report::{ProjectReport, WrittenFile};
pub use sanitize::{sanitize, sanitize_markdown, sanitize_python};
pub use types::{
    ContextExcerpt, FileRole, GenerationRequest, SanitizedArtifact, SourceLanguage, SyntaxIssue,
    ValidationVerdict,
};
pub use validate::{validate, validate_python, verdict_for};
