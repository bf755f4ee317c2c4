use serde::{Deserialize, Serialize};

/// Language a generated file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Markdown,
    Python,
}

/// The part a file plays in a generated project.
///
/// Each role maps to exactly one file name inside the project directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Architecture,
    Code,
    Tests,
    Documentation,
}

impl FileRole {
    /// Every role, in generation order.
    pub const ALL: [FileRole; 4] = [
        FileRole::Architecture,
        FileRole::Code,
        FileRole::Tests,
        FileRole::Documentation,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            FileRole::Architecture => "architecture.md",
            FileRole::Code => "main.py",
            FileRole::Tests => "test_main.py",
            FileRole::Documentation => "README.md",
        }
    }

    pub fn language(&self) -> SourceLanguage {
        match self {
            FileRole::Architecture | FileRole::Documentation => SourceLanguage::Markdown,
            FileRole::Code | FileRole::Tests => SourceLanguage::Python,
        }
    }

    /// Parse a role from its CLI name or its file name.
    pub fn parse(value: &str) -> Option<FileRole> {
        let value = value.trim().to_ascii_lowercase();
        FileRole::ALL.into_iter().find(|role| {
            value == role.as_str() || value == role.file_name().to_ascii_lowercase()
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Architecture => "architecture",
            FileRole::Code => "code",
            FileRole::Tests => "tests",
            FileRole::Documentation => "documentation",
        }
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Excerpt of an already resolved file handed to the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextExcerpt {
    pub role: FileRole,
    pub text: String,
}

/// A request for one file of a generated project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// What the user asked for, verbatim.
    pub description: String,
    /// Which file this request produces.
    pub role: FileRole,
    /// Optional excerpt of an earlier file of the same project.
    pub context: Option<ContextExcerpt>,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>, role: FileRole) -> Self {
        Self {
            description: description.into(),
            role,
            context: None,
        }
    }

    pub fn with_context(mut self, context: ContextExcerpt) -> Self {
        self.context = Some(context);
        self
    }
}

/// Position and description of the first syntax problem in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxIssue {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.message, self.line, self.column
        )
    }
}

/// Outcome of validating a sanitized artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Valid,
    SyntaxError(SyntaxIssue),
    Empty,
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationVerdict::Valid)
    }

    /// Short reason suitable for a corrective prompt or a log line.
    pub fn reason(&self) -> String {
        match self {
            ValidationVerdict::Valid => "valid".to_string(),
            ValidationVerdict::SyntaxError(issue) => format!("syntax error: {}", issue),
            ValidationVerdict::Empty => "the response was empty".to_string(),
        }
    }
}

/// Model output with formatting artifacts removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedArtifact {
    pub role: FileRole,
    pub body: String,
    /// Set by the validator; `None` until validated.
    pub verdict: Option<ValidationVerdict>,
}

impl SanitizedArtifact {
    pub fn is_valid(&self) -> bool {
        self.verdict.as_ref().is_some_and(ValidationVerdict::is_valid)
    }
}
