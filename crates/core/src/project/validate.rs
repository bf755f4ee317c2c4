//! Syntax validation for sanitized artifacts.
//!
//! Python is parsed with tree-sitter. The grammar is error tolerant, so a
//! file is rejected as soon as the tree holds an ERROR or MISSING node. The
//! grammar also accepts Python 2 forms and a few constructs the compiler
//! refuses later (`return` at module level, duplicate parameters, ...); a
//! second walk over the tree rejects those with the compiler's wording.

use std::collections::HashSet;

use tree_sitter::{Node, Parser, Tree};

use super::types::{SanitizedArtifact, SourceLanguage, SyntaxIssue, ValidationVerdict};

/// Longest snippet quoted in an "unexpected" message.
const SNIPPET_CHARS: usize = 40;

/// Validate an artifact, returning a copy with its verdict set.
pub fn validate(artifact: &SanitizedArtifact) -> SanitizedArtifact {
    SanitizedArtifact {
        verdict: Some(verdict_for(artifact.role.language(), &artifact.body)),
        ..artifact.clone()
    }
}

/// Compute the verdict for a body written in `language`.
pub fn verdict_for(language: SourceLanguage, body: &str) -> ValidationVerdict {
    if body.trim().is_empty() {
        return ValidationVerdict::Empty;
    }

    match language {
        // Markdown has no syntax to reject
        SourceLanguage::Markdown => ValidationVerdict::Valid,
        SourceLanguage::Python => validate_python(body),
    }
}

/// Parse Python source with the tree-sitter grammar.
pub(crate) fn parse_python(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    parser.parse(source, None)
}

/// Parse Python source and report the first syntax problem, if any.
pub fn validate_python(source: &str) -> ValidationVerdict {
    if source.trim().is_empty() {
        return ValidationVerdict::Empty;
    }

    let Some(tree) = parse_python(source) else {
        return ValidationVerdict::SyntaxError(SyntaxIssue {
            line: 1,
            column: 1,
            message: "parser gave up on the input".to_string(),
        });
    };

    let root = tree.root_node();
    if root.has_error() {
        let issue = first_error(root)
            .map(|node| describe(node, source))
            .unwrap_or_else(|| SyntaxIssue {
                line: 1,
                column: 1,
                message: "invalid syntax".to_string(),
            });
        return ValidationVerdict::SyntaxError(issue);
    }

    match first_rejected(root, source) {
        Some(issue) => ValidationVerdict::SyntaxError(issue),
        None => ValidationVerdict::Valid,
    }
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();

    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

/// Pre-order walk for the first construct Python 3 refuses to compile.
fn first_rejected(root: Node<'_>, source: &str) -> Option<SyntaxIssue> {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(message) = rejection(node, source) {
            return Some(issue_at(node, message));
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    None
}

fn rejection(node: Node<'_>, source: &str) -> Option<String> {
    if is_unexpected_indent(node, source) {
        return Some("unexpected indent".to_string());
    }

    let message = match node.kind() {
        "print_statement" => "Missing parentheses in call to 'print'",
        "exec_statement" => "Missing parentheses in call to 'exec'",
        "except_clause" if has_token(node, ",") => {
            "multiple exception types must be parenthesized"
        }
        "comparison_operator" if has_token(node, "<>") => "invalid syntax",
        "expression_statement"
            if node
                .named_child(0)
                .is_some_and(|child| child.kind() == "named_expression") =>
        {
            "invalid syntax"
        }
        "parameters" | "lambda_parameters" => return parameter_problem(node, source),
        "return_statement" if !enclosing_scope(node).is_some_and(is_function) => {
            "'return' outside function"
        }
        "yield" if node.is_named() && !enclosing_scope(node).is_some_and(is_callable) => {
            "'yield' outside function"
        }
        "await" if node.is_named() && !enclosing_scope(node).is_some_and(is_async_function) => {
            "'await' outside async function"
        }
        "nonlocal_statement" if !enclosing_scope(node).is_some_and(is_function) => {
            "nonlocal declaration not allowed at module level"
        }
        "break_statement" if !in_loop(node) => "'break' outside loop",
        "continue_statement" if !in_loop(node) => "'continue' not properly in loop",
        _ => return None,
    };

    Some(message.to_string())
}

/// A top-level statement that starts its line after whitespace.
fn is_unexpected_indent(node: Node<'_>, source: &str) -> bool {
    if !node.is_named() || node.is_extra() || node.parent().map(|p| p.kind()) != Some("module") {
        return false;
    }

    let column = node.start_position().column;
    let start = node.start_byte();

    column > 0
        && source
            .get(start - column..start)
            .is_some_and(|prefix| prefix.trim().is_empty())
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Nearest function, lambda or class around `node`.
fn enclosing_scope(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();

    while let Some(parent) = current {
        if matches!(
            parent.kind(),
            "function_definition" | "lambda" | "class_definition"
        ) {
            return Some(parent);
        }
        current = parent.parent();
    }

    None
}

fn is_function(scope: Node<'_>) -> bool {
    scope.kind() == "function_definition"
}

fn is_callable(scope: Node<'_>) -> bool {
    matches!(scope.kind(), "function_definition" | "lambda")
}

fn is_async_function(scope: Node<'_>) -> bool {
    is_function(scope) && has_token(scope, "async")
}

/// Inside the body of a `for` or `while`, not its `else` clause, and not
/// across a function or class boundary.
fn in_loop(node: Node<'_>) -> bool {
    let mut child = node;
    let mut current = node.parent();

    while let Some(parent) = current {
        match parent.kind() {
            "for_statement" | "while_statement" if child.kind() != "else_clause" => return true,
            "function_definition" | "lambda" | "class_definition" => return false,
            _ => {}
        }
        child = parent;
        current = parent.parent();
    }

    false
}

/// Tuple parameters are Python 2 only; names must be unique.
fn parameter_problem(node: Node<'_>, source: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let mut cursor = node.walk();

    for param in node.named_children(&mut cursor) {
        let unpacks = param.kind() == "tuple_pattern"
            || param
                .child_by_field_name("name")
                .is_some_and(|name| name.kind() == "tuple_pattern");
        if unpacks {
            return Some("invalid syntax".to_string());
        }

        if let Some(name) = parameter_name(param, source) {
            if !seen.insert(name) {
                return Some(format!("duplicate argument '{name}' in function definition"));
            }
        }
    }

    None
}

fn parameter_name<'s>(param: Node<'_>, source: &'s str) -> Option<&'s str> {
    let name = match param.kind() {
        "identifier" => param,
        "default_parameter" | "typed_default_parameter" => param.child_by_field_name("name")?,
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            param.named_child(0)?
        }
        _ => return None,
    };

    match name.kind() {
        "identifier" => name.utf8_text(source.as_bytes()).ok(),
        "list_splat_pattern" | "dictionary_splat_pattern" => parameter_name(name, source),
        _ => None,
    }
}

fn issue_at(node: Node<'_>, message: String) -> SyntaxIssue {
    let position = node.start_position();

    SyntaxIssue {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

fn describe(node: Node<'_>, source: &str) -> SyntaxIssue {
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
        let first_line = text.lines().next().unwrap_or_default().trim();

        if first_line.is_empty() {
            "invalid syntax".to_string()
        } else {
            let snippet: String = first_line.chars().take(SNIPPET_CHARS).collect();
            format!("unexpected `{snippet}`")
        }
    };

    issue_at(node, message)
}
