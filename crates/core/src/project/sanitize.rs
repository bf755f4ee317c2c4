//! Strip markdown and chatter from model output.
//!
//! Every function here is idempotent: feeding its output back in returns the
//! same text.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{FileRole, SanitizedArtifact, SourceLanguage};
use super::validate::parse_python;

const FENCE: &str = "```";
const PYTHON_SHEBANG: &str = "#!/usr/bin/env python3";

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// Sanitize raw model output for the given role.
///
/// The returned artifact has no verdict yet; run it through
/// [`validate`](super::validate::validate).
pub fn sanitize(role: FileRole, raw: &str) -> SanitizedArtifact {
    let body = match role.language() {
        SourceLanguage::Python => {
            let code = sanitize_python(raw);
            if role == FileRole::Tests {
                ensure_unittest_import(code)
            } else {
                code
            }
        }
        SourceLanguage::Markdown => sanitize_markdown(raw),
    };

    SanitizedArtifact {
        role,
        body,
        verdict: None,
    }
}

/// Extract Python source from a model response.
///
/// Keeps the bodies of Python (or untagged) fenced blocks when there are any,
/// drops every remaining fence line and strips prose before and after the
/// code. A foreign shebang is rewritten; a missing one is left missing.
pub fn sanitize_python(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let text = normalized.trim();

    if text.is_empty() {
        return String::new();
    }

    // A lone stray fence opens an empty block; that is not a code block
    let blocks: Vec<FencedBlock<'_>> = fenced_blocks(text)
        .into_iter()
        .filter(|block| block.lines.iter().any(|line| !line.trim().is_empty()))
        .collect();
    let text = if blocks.is_empty() {
        text.to_string()
    } else {
        join_python_blocks(&blocks)
    };

    let text = remove_fence_lines(&text);
    let text = strip_edge_prose(&text).trim().to_string();

    normalize_shebang(text)
}

/// Unwrap a markdown document the model put inside a ```markdown fence.
///
/// Fenced examples inside the document are content and stay. Unwrapping can
/// expose another wrapper (prose, then a second ```md fence), so passes repeat
/// until the text stops changing. Every pass that changes the text shortens
/// it, so this terminates.
pub fn sanitize_markdown(raw: &str) -> String {
    let mut text = markdown_pass(raw);

    loop {
        let next = markdown_pass(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}

fn markdown_pass(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let text = normalized.trim();

    if text.is_empty() {
        return String::new();
    }

    let text = unwrap_markdown_fence(text);
    let text = drop_stray_closing_fence(&text);
    let text = strip_prose_before_heading(&text);

    collapse_blank_runs(&text).trim().to_string()
}

/// A line that reads like a sentence rather than code.
///
/// Python statements either start lowercase, or carry at least one of the
/// punctuation characters below. Headings and comments start with `#`.
pub fn is_prose_line(line: &str) -> bool {
    let line = line.trim();

    line.starts_with(|c: char| c.is_ascii_uppercase())
        && line.contains(char::is_whitespace)
        && !line.contains(['(', ')', '[', ']', '{', '}', '=', '<', '>', '#', '"', '`'])
}

#[derive(Debug)]
struct FencedBlock<'a> {
    tag: String,
    lines: Vec<&'a str>,
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

/// First word after the backticks, lowercased (`"```Python main.py"` -> `"python"`).
fn fence_tag(line: &str) -> String {
    line.trim_start()
        .trim_start_matches('`')
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock<'_>> = None;

    for line in text.lines() {
        if is_fence(line) {
            match current.take() {
                Some(block) => blocks.push(block),
                None => {
                    current = Some(FencedBlock {
                        tag: fence_tag(line),
                        lines: Vec::new(),
                    })
                }
            }
        } else if let Some(block) = current.as_mut() {
            block.lines.push(line);
        }
    }

    // Unclosed block runs to the end of the response
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
}

fn join_python_blocks(blocks: &[FencedBlock<'_>]) -> String {
    let python: Vec<&FencedBlock<'_>> = blocks
        .iter()
        .filter(|block| matches!(block.tag.as_str(), "" | "python" | "py" | "python3"))
        .collect();

    let selected = if python.is_empty() {
        blocks.iter().take(1).collect()
    } else {
        python
    };

    selected
        .iter()
        .map(|block| block.lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn remove_fence_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_fence(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_runs(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").into_owned()
}

fn strip_edge_prose(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let is_noise = |line: &&str| line.trim().is_empty() || is_prose_line(line);

    let Some(start) = lines.iter().position(|line| !is_noise(line)) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !is_noise(line))
        .unwrap_or(start);

    lines[start..=end].join("\n")
}

fn normalize_shebang(text: String) -> String {
    if !text.starts_with("#!") || text.starts_with("#!/usr/bin/env python") {
        return text;
    }

    match text.split_once('\n') {
        Some((_, rest)) => format!("{PYTHON_SHEBANG}\n{rest}"),
        None => PYTHON_SHEBANG.to_string(),
    }
}

/// Make sure a test module imports `unittest`.
///
/// The import goes after a shebang and after any `from __future__` imports,
/// which Python requires to come first.
fn ensure_unittest_import(body: String) -> String {
    if body.is_empty() || body.contains("import unittest") {
        return body;
    }

    let lines: Vec<&str> = body.lines().collect();
    let after_shebang = lines.first().filter(|l| l.starts_with("#!")).map(|_| 1);
    let at = after_future_imports(&body)
        .or(after_shebang)
        .unwrap_or(0)
        .min(lines.len());

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..at]);
    out.push("import unittest");
    out.extend_from_slice(&lines[at..]);
    out.join("\n")
}

/// Line after the last `from __future__` import, parenthesized ones included.
fn after_future_imports(body: &str) -> Option<usize> {
    let tree = parse_python(body)?;
    let root = tree.root_node();
    let mut cursor = root.walk();
    let mut after = None;

    for node in root.named_children(&mut cursor) {
        if node.kind() == "future_import_statement" {
            after = Some(node.end_position().row + 1);
        }
    }

    after
}

fn unwrap_markdown_fence(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    let Some(open) = lines
        .iter()
        .position(|line| !line.trim().is_empty() && !is_prose_line(line))
    else {
        return text.to_string();
    };

    if !is_fence(lines[open]) || !matches!(fence_tag(lines[open]).as_str(), "markdown" | "md") {
        return text.to_string();
    }

    let close = lines
        .iter()
        .rposition(|line| line.trim() == FENCE)
        .filter(|&close| close > open)
        .unwrap_or(lines.len());

    lines[open + 1..close].join("\n")
}

fn drop_stray_closing_fence(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let fences = lines.iter().filter(|line| is_fence(line)).count();

    if fences % 2 == 0 {
        return text.to_string();
    }

    match lines.iter().rposition(|line| !line.trim().is_empty()) {
        Some(last) if lines[last].trim() == FENCE => {
            let mut kept = lines;
            kept.remove(last);
            kept.join("\n")
        }
        _ => text.to_string(),
    }
}

fn strip_prose_before_heading(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    let Some(heading) = lines
        .iter()
        .position(|line| line.trim_start().starts_with('#'))
    else {
        return text.to_string();
    };

    let preamble_is_chatter = lines[..heading]
        .iter()
        .all(|line| line.trim().is_empty() || is_prose_line(line));

    if heading > 0 && preamble_is_chatter {
        lines[heading..].join("\n")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_fence_line(text: &str) -> bool {
        text.lines().any(|line| line.trim_start().starts_with("```"))
    }

    #[test]
    fn test_python_fence_is_removed() {
        assert_eq!(sanitize_python("```python\nprint('hi')\n```"), "print('hi')");
    }

    #[test]
    fn test_plain_fence_is_removed() {
        let raw = "```\ndef add(a, b):\n    return a + b\n```";
        assert_eq!(sanitize_python(raw), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn test_clean_code_passes_through() {
        let code = "import sys\n\n\ndef main():\n    print(sys.argv)";
        assert_eq!(sanitize_python(code), code);
    }

    #[test]
    fn test_leading_and_trailing_commentary() {
        let raw = "Here's the implementation:\n```python\nimport os\n\nprint(os.getcwd())\n```\nThis script prints the working directory.";
        assert_eq!(sanitize_python(raw), "import os\n\nprint(os.getcwd())");
    }

    #[test]
    fn test_leading_prose_without_fence() {
        let raw = "Sure, here is the code:\nimport math\nprint(math.pi)";
        assert_eq!(sanitize_python(raw), "import math\nprint(math.pi)");
    }

    #[test]
    fn test_multiple_python_blocks_are_joined() {
        let raw = "First the helper:\n```python\ndef helper():\n    return 1\n```\nThen the entry point:\n```py\nprint(helper())\n```";
        assert_eq!(
            sanitize_python(raw),
            "def helper():\n    return 1\n\nprint(helper())"
        );
    }

    #[test]
    fn test_non_python_blocks_are_skipped_when_python_exists() {
        let raw = "Install first:\n```bash\npip install requests\n```\n```python\nimport requests\n```";
        assert_eq!(sanitize_python(raw), "import requests");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let raw = "```python\nx = 1\nprint(x)";
        assert_eq!(sanitize_python(raw), "x = 1\nprint(x)");
    }

    #[test]
    fn test_stray_closing_fence_keeps_code() {
        assert_eq!(sanitize_python("print(1)\n```"), "print(1)");
    }

    #[test]
    fn test_windows_line_endings() {
        let raw = "```python\r\nx = 1\r\n\r\ny = 2\r\n```";
        assert_eq!(sanitize_python(raw), "x = 1\n\ny = 2");
    }

    #[test]
    fn test_foreign_shebang_is_normalized() {
        let raw = "#!/usr/bin/python\nprint('x')";
        assert_eq!(
            sanitize_python(raw),
            "#!/usr/bin/env python3\nprint('x')"
        );
    }

    #[test]
    fn test_env_shebang_is_kept() {
        let raw = "#!/usr/bin/env python\nprint('x')";
        assert_eq!(sanitize_python(raw), raw);
    }

    #[test]
    fn test_missing_shebang_is_not_added() {
        assert!(!sanitize_python("print('x')").starts_with("#!"));
    }

    #[test]
    fn test_prose_only_response_is_empty() {
        assert_eq!(sanitize_python("I cannot help with that request."), "");
        assert_eq!(sanitize_python("   \n\n  "), "");
    }

    #[test]
    fn test_is_prose_line() {
        assert!(is_prose_line("Here is the code:"));
        assert!(is_prose_line("Here's the implementation:"));
        assert!(is_prose_line("This program prints a greeting."));
        assert!(!is_prose_line("import os"));
        assert!(!is_prose_line("print('hi')"));
        assert!(!is_prose_line("MAX_SIZE = 10"));
        assert!(!is_prose_line("# Architecture Document"));
        assert!(!is_prose_line("Calculator"));
        assert!(!is_prose_line("```python"));
    }

    #[test]
    fn test_python_output_never_has_fences() {
        let inputs = [
            "```python\nprint(1)\n```",
            "text\n```\nprint(1)\n```\nmore ```",
            "```js\nconsole.log(1)\n```",
            "print(1)\n```",
            "```python\n```python\nprint(1)\n```\n```",
            "  ```  \nprint(1)",
        ];

        for raw in inputs {
            let out = sanitize_python(raw);
            assert!(!has_fence_line(&out), "fence left in {out:?} for {raw:?}");
        }
    }

    #[test]
    fn test_tests_role_gets_unittest_import() {
        let artifact = sanitize(FileRole::Tests, "class T:\n    pass");
        assert_eq!(artifact.body, "import unittest\nclass T:\n    pass");
    }

    #[test]
    fn test_unittest_import_goes_after_shebang() {
        let artifact = sanitize(FileRole::Tests, "#!/usr/bin/env python3\nimport os");
        assert_eq!(
            artifact.body,
            "#!/usr/bin/env python3\nimport unittest\nimport os"
        );
    }

    #[test]
    fn test_unittest_import_goes_after_future_imports() {
        let artifact = sanitize(
            FileRole::Tests,
            "from __future__ import annotations\nimport os",
        );
        assert_eq!(
            artifact.body,
            "from __future__ import annotations\nimport unittest\nimport os"
        );
    }

    #[test]
    fn test_unittest_import_goes_after_parenthesized_future_import() {
        let raw = "from __future__ import (\n    annotations,\n)\nimport main\n\nclass T:\n    pass";
        let artifact = sanitize(FileRole::Tests, raw);

        assert_eq!(
            artifact.body,
            "from __future__ import (\n    annotations,\n)\nimport unittest\nimport main\n\nclass T:\n    pass"
        );
        assert_eq!(
            crate::project::validate::validate_python(&artifact.body),
            crate::project::types::ValidationVerdict::Valid
        );
    }

    #[test]
    fn test_unittest_import_not_duplicated() {
        let body = "import unittest\n\nclass T(unittest.TestCase):\n    pass";
        assert_eq!(sanitize(FileRole::Tests, body).body, body);
    }

    #[test]
    fn test_empty_tests_stay_empty() {
        assert_eq!(sanitize(FileRole::Tests, "```python\n```").body, "");
    }

    #[test]
    fn test_code_role_does_not_get_unittest_import() {
        assert_eq!(sanitize(FileRole::Code, "x = 1").body, "x = 1");
    }

    #[test]
    fn test_markdown_wrapper_is_unwrapped() {
        let raw = "```markdown\n# Architecture Document\n\n## Overview\nText\n```";
        assert_eq!(
            sanitize_markdown(raw),
            "# Architecture Document\n\n## Overview\nText"
        );
    }

    #[test]
    fn test_markdown_wrapper_keeps_inner_examples() {
        let raw = "Here is the README:\n```md\n# Tool\n\n```bash\npython main.py\n```\n\nDone\n```\nEnjoy!";
        assert_eq!(
            sanitize_markdown(raw),
            "# Tool\n\n```bash\npython main.py\n```\n\nDone"
        );
    }

    #[test]
    fn test_markdown_stray_closing_fence() {
        let raw = "# Title\n\nBody text\n```";
        assert_eq!(sanitize_markdown(raw), "# Title\n\nBody text");
    }

    #[test]
    fn test_markdown_balanced_fences_untouched() {
        let raw = "# Title\n\n```bash\nls\n```";
        assert_eq!(sanitize_markdown(raw), raw);
    }

    #[test]
    fn test_markdown_prose_before_heading_dropped() {
        let raw = "Certainly! Here is your document\n\n# Project\n\nDetails";
        assert_eq!(sanitize_markdown(raw), "# Project\n\nDetails");
    }

    #[test]
    fn test_markdown_badges_before_heading_kept() {
        let raw = "[![build](https://ci/badge.svg)](https://ci)\n# Project";
        assert_eq!(sanitize_markdown(raw), raw);
    }

    /// Line shapes models mix together: fences, chatter, headings and code.
    const LINE_KINDS: [&str; 13] = [
        "```",
        "```md",
        "```markdown",
        "```python",
        "```bash",
        "Here is text",
        "Sure! Here's the code:",
        "# A",
        "x = 1",
        "    return x",
        "#!/bin/sh",
        "- item",
        "",
    ];

    /// Every text of one to `max_lines` lines drawn from `LINE_KINDS`.
    fn line_combinations(max_lines: usize) -> Vec<String> {
        let mut all = Vec::new();
        let mut current: Vec<Vec<&str>> = vec![Vec::new()];

        for _ in 0..max_lines {
            let mut next = Vec::with_capacity(current.len() * LINE_KINDS.len());
            for prefix in &current {
                for kind in LINE_KINDS {
                    let mut lines = prefix.clone();
                    lines.push(kind);
                    all.push(lines.join("\n"));
                    next.push(lines);
                }
            }
            current = next;
        }

        all
    }

    #[test]
    fn test_sanitize_is_idempotent_for_every_role() {
        for raw in line_combinations(4) {
            for role in FileRole::ALL {
                let once = sanitize(role, &raw).body;
                let twice = sanitize(role, &once).body;
                assert_eq!(twice, once, "{role} not idempotent for {raw:?}");
            }
        }
    }

    #[test]
    fn test_markdown_wrapper_behind_prose_is_unwrapped_fully() {
        let raw = "```md\nHere is text\n```md\n# A";
        assert_eq!(sanitize_markdown(raw), "# A");
    }

    #[test]
    fn test_sanitize_leaves_verdict_unset() {
        let artifact = sanitize(FileRole::Architecture, "# A");
        assert_eq!(artifact.role, FileRole::Architecture);
        assert!(artifact.verdict.is_none());
    }
}
