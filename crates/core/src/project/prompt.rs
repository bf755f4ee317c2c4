use super::types::{ContextExcerpt, FileRole, GenerationRequest, SourceLanguage, ValidationVerdict};

/// Characters of the architecture document shown to the code prompt.
pub const ARCHITECTURE_EXCERPT_CHARS: usize = 500;
/// Characters of the main module shown to the tests prompt.
pub const CODE_EXCERPT_CHARS: usize = 1000;

const PYTHON_PREAMBLE: &str = "\
You are a Python code generator. You receive a project request and an instruction.
You output ONLY valid Python 3 source code.

Rules:
- Output raw Python code only. No markdown fences. No explanations. No commentary.
- Start directly with the shebang or the imports.
- Include every import the code needs.
- Never leave placeholders or TODOs.";

const MARKDOWN_PREAMBLE: &str = "\
You are a technical writer. You receive a project request and an instruction.
You output ONLY the requested Markdown document.

Rules:
- Output the document itself. Do not wrap it in a code block.
- Do not add an introduction or a closing remark around the document.
- Be specific; never leave placeholders or TODOs.";

/// System preamble for the language of `role`.
pub fn preamble(role: FileRole) -> &'static str {
    match role.language() {
        SourceLanguage::Python => PYTHON_PREAMBLE,
        SourceLanguage::Markdown => MARKDOWN_PREAMBLE,
    }
}

/// Which earlier file a role gets an excerpt of, and how long it is.
pub fn context_source(role: FileRole) -> Option<(FileRole, usize)> {
    match role {
        FileRole::Code => Some((FileRole::Architecture, ARCHITECTURE_EXCERPT_CHARS)),
        FileRole::Tests => Some((FileRole::Code, CODE_EXCERPT_CHARS)),
        FileRole::Architecture | FileRole::Documentation => None,
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn excerpt(role: FileRole, text: &str, max_chars: usize) -> ContextExcerpt {
    ContextExcerpt {
        role,
        text: text.chars().take(max_chars).collect(),
    }
}

/// Build the prompt for one file of the project.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut parts = vec![instruction(request.role, &request.description)];

    if let Some(context) = &request.context {
        let ellipsis = if context.text.is_empty() { "" } else { "..." };
        parts.push(format!(
            "Excerpt of {}:\n{}{}",
            context.role.file_name(),
            context.text,
            ellipsis
        ));
    }

    parts.push(requirements(request.role).to_string());

    parts.join("\n\n")
}

/// Build the prompt for a retry after `verdict` rejected the last response.
pub fn build_corrective_prompt(request: &GenerationRequest, verdict: &ValidationVerdict) -> String {
    format!(
        "{}\n\nYour previous response was rejected: {}.\n\
         Return the complete {} again with that problem fixed. \
         Output only the file contents, with no markdown fences and no explanations.",
        build_prompt(request),
        verdict.reason(),
        request.role.file_name(),
    )
}

fn instruction(role: FileRole, description: &str) -> String {
    match role {
        FileRole::Architecture => format!(
            "Create a comprehensive software architecture document for this request:\n{description}"
        ),
        FileRole::Code => {
            format!("Create complete Python code implementing this request:\n{description}")
        }
        FileRole::Tests => format!(
            "Create comprehensive unit tests for the main.py module of this project:\n{description}"
        ),
        FileRole::Documentation => format!(
            "Create comprehensive README.md documentation for this project:\n{description}\n\n\
             The project has these files:\n\
             - main.py (main code)\n\
             - test_main.py (unit tests)\n\
             - architecture.md (architecture document)"
        ),
    }
}

fn requirements(role: FileRole) -> &'static str {
    match role {
        FileRole::Architecture => {
            "The document must contain these sections:\n\
             1. Project Overview\n\
             2. System Architecture\n\
             3. Component Design\n\
             4. Data Flow\n\
             5. Implementation Strategy\n\
             6. Technology Stack\n\
             7. Development Phases\n\n\
             Start your response with:\n\
             # Architecture Document"
        }
        FileRole::Code => {
            "Requirements:\n\
             - A complete, working Python application\n\
             - Proper class and function structure\n\
             - Error handling\n\
             - A main execution block guarded by if __name__ == \"__main__\"\n\
             - Respond with pure Python code only"
        }
        FileRole::Tests => {
            "Requirements:\n\
             - Use the unittest framework and import main\n\
             - Include setUp and tearDown methods\n\
             - At least 5 test cases\n\
             - Respond with pure Python code only"
        }
        FileRole::Documentation => {
            "Include these sections:\n\
             1. Project Title and Description\n\
             2. Features\n\
             3. Installation\n\
             4. Usage Examples\n\
             5. Testing\n\
             6. Project Structure\n\
             7. Contributing\n\
             8. License\n\n\
             Start with the project name as a level-one heading."
        }
    }
}
