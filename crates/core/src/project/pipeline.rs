//! Turn one model response into a decision: accept it, retry, or fall back.
//!
//! The model call itself lives in the shell; this module only decides what
//! happens with each response. The shell loops on [`evaluate_attempt`] until
//! it returns something other than [`Step::Retry`].

use serde::Serialize;

use super::fallback::fallback_body;
use super::prompt::build_corrective_prompt;
use super::sanitize::sanitize;
use super::types::{FileRole, GenerationRequest, SanitizedArtifact, ValidationVerdict};
use super::validate::validate;

/// How many corrective retries a file gets before the fallback is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 1;

    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total model calls a file may take.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES)
    }
}

/// Where the body of a resolved file came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum FileOrigin {
    /// Model output that passed validation after `attempts` calls.
    Generated { attempts: u32 },
    /// Fallback body; `verdict` is what the last response was rejected with.
    Fallback { verdict: ValidationVerdict },
}

/// The final body for one role.
///
/// Only two constructors exist, so a `ResolvedFile` always holds either a
/// validated artifact or the registered fallback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    role: FileRole,
    body: String,
    origin: FileOrigin,
}

impl ResolvedFile {
    /// Accept a validated artifact. Hands the artifact back when its verdict
    /// is missing or not valid.
    pub fn accepted(artifact: SanitizedArtifact, attempts: u32) -> Result<Self, SanitizedArtifact> {
        if !artifact.is_valid() {
            return Err(artifact);
        }

        Ok(Self {
            role: artifact.role,
            body: artifact.body,
            origin: FileOrigin::Generated { attempts },
        })
    }

    /// Use the registered fallback body for `role`.
    pub fn fallback(role: FileRole, description: &str, verdict: ValidationVerdict) -> Self {
        Self {
            role,
            body: fallback_body(role, description),
            origin: FileOrigin::Fallback { verdict },
        }
    }

    pub fn role(&self) -> FileRole {
        self.role
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn origin(&self) -> &FileOrigin {
        &self.origin
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, FileOrigin::Fallback { .. })
    }
}

/// What to do after one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Accept(ResolvedFile),
    /// Ask again with `prompt`, which carries the reason for the rejection.
    Retry {
        prompt: String,
        verdict: ValidationVerdict,
    },
    Fallback(ResolvedFile),
}

/// Progress notifications emitted while a project is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    Started { role: FileRole },
    Retrying { role: FileRole, attempt: u32, reason: String },
    Accepted { role: FileRole, attempts: u32 },
    FellBack { role: FileRole, reason: String },
    Written { role: FileRole, bytes: usize },
}

/// Sanitize and validate `raw`, then decide the next step.
///
/// `attempt` is zero-based: the first response is attempt 0.
pub fn evaluate_attempt(
    request: &GenerationRequest,
    raw: &str,
    attempt: u32,
    policy: &RetryPolicy,
) -> Step {
    let artifact = validate(&sanitize(request.role, raw));
    let verdict = artifact
        .verdict
        .clone()
        .unwrap_or(ValidationVerdict::Empty);

    match ResolvedFile::accepted(artifact, attempt + 1) {
        Ok(file) => Step::Accept(file),
        Err(_) if attempt < policy.max_retries => Step::Retry {
            prompt: build_corrective_prompt(request, &verdict),
            verdict,
        },
        Err(_) => Step::Fallback(ResolvedFile::fallback(
            request.role,
            &request.description,
            verdict,
        )),
    }
}
