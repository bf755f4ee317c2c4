//! Known-good bodies written when generation cannot produce a valid file.
//!
//! The request description is woven into each body. In Python bodies it only
//! ever appears as a single `#` comment line, so no description can make a
//! fallback fail to parse.

use super::types::FileRole;

const DESCRIPTION_SLOT: &str = "{{DESCRIPTION}}";

const ARCHITECTURE: &str = r##"# Architecture Document

## Project Overview
This project implements: {{DESCRIPTION}}

## System Architecture
The system is a single command-line program with a clear split between input
handling, processing and output:
- **Interface layer**: parses arguments and reads input
- **Processing layer**: pure functions that transform the input
- **Output layer**: formats and prints results

## Component Design
1. **Argument parser** (`build_parser`): declares the command-line interface.
2. **Processor** (`perform_processing`): turns input text into a report.
3. **Entry point** (`main`): wires the parser, the processor and the output
   together and returns an exit status.

## Data Flow
1. The user runs `python main.py` with text arguments or piped input.
2. `main` collects the input and rejects empty input.
3. `perform_processing` builds the report.
4. The report is written to standard output.

## Implementation Strategy
Keep processing free of I/O so it can be unit tested directly. The entry point
returns an exit status instead of calling `sys.exit`, which keeps it testable
as well.

## Technology Stack
- **Language**: Python 3.8+
- **Interface**: argparse
- **Testing**: unittest

## Development Phases
1. **Core**: processing functions and their tests
2. **Interface**: argument parsing and stdin support
3. **Polish**: error messages and documentation
"##;

const CODE: &str = r##"#!/usr/bin/env python3
"""Command-line text processor."""
# Request: {{DESCRIPTION}}

import argparse
import sys


def perform_processing(text):
    """Return a short report describing the given text."""
    words = text.split()
    lines = [
        "Processed: " + text,
        "Length: %d characters" % len(text),
        "Words: %d words" % len(words),
        "Uppercase: " + text.upper(),
        "Reversed: " + text[::-1],
    ]
    return "\n".join(lines) + "\n"


def build_parser():
    parser = argparse.ArgumentParser(description="Process text and print a short report.")
    parser.add_argument("text", nargs="*", help="text to process; read from stdin when omitted")
    return parser


def main(argv=None):
    args = build_parser().parse_args(argv)
    text = " ".join(args.text) if args.text else sys.stdin.read().strip()

    if not text:
        print("Nothing to process", file=sys.stderr)
        return 1

    sys.stdout.write(perform_processing(text))
    return 0


if __name__ == "__main__":
    sys.exit(main())
"##;

const TESTS: &str = r##"#!/usr/bin/env python3
"""Unit tests for main.py."""
# Request: {{DESCRIPTION}}

import io
import os
import sys
import unittest
from unittest import mock

sys.path.insert(0, os.path.dirname(os.path.abspath(__file__)))

import main


class PerformProcessingTest(unittest.TestCase):
    def setUp(self):
        self.text = "test data"

    def tearDown(self):
        self.text = None

    def test_reports_length(self):
        self.assertIn("Length: 9 characters", main.perform_processing(self.text))

    def test_reports_word_count(self):
        self.assertIn("Words: 2 words", main.perform_processing(self.text))

    def test_reports_uppercase(self):
        self.assertIn("Uppercase: TEST DATA", main.perform_processing(self.text))

    def test_reports_reversed(self):
        self.assertIn("Reversed: atad tset", main.perform_processing(self.text))

    def test_handles_special_characters(self):
        result = main.perform_processing("!@#$%^&*()")
        self.assertIn("Length: 10 characters", result)


class MainTest(unittest.TestCase):
    def test_main_processes_arguments(self):
        with mock.patch("sys.stdout", new_callable=io.StringIO) as out:
            status = main.main(["hello", "world"])
        self.assertEqual(status, 0)
        self.assertIn("Processed: hello world", out.getvalue())

    def test_main_rejects_empty_input(self):
        with mock.patch("sys.stdin", io.StringIO("")):
            with mock.patch("sys.stderr", new_callable=io.StringIO):
                status = main.main([])
        self.assertEqual(status, 1)


if __name__ == "__main__":
    unittest.main()
"##;

const DOCUMENTATION: &str = r##"# Project Documentation

## Description
This project implements: {{DESCRIPTION}}

## Features
- Command-line interface built on argparse
- Text report with length, word count, uppercase and reversed forms
- Reads from arguments or standard input
- Unit test suite

## Installation
Requires Python 3.8 or newer. No third-party packages are needed.

```bash
cd <project-directory>
```

## Usage
```bash
python main.py hello world
echo "hello world" | python main.py
```

## Testing
```bash
python -m unittest test_main
```

## Project Structure
```
architecture.md   # System design document
main.py           # Application code
test_main.py      # Unit tests
README.md         # This file
```

## Contributing
1. Fork the repository
2. Create a feature branch
3. Commit your changes
4. Open a pull request

## License
MIT
"##;

/// Return the fallback body registered for `role`.
pub fn fallback_body(role: FileRole, description: &str) -> String {
    let template = match role {
        FileRole::Architecture => ARCHITECTURE,
        FileRole::Code => CODE,
        FileRole::Tests => TESTS,
        FileRole::Documentation => DOCUMENTATION,
    };

    template
        .replace(DESCRIPTION_SLOT, &single_line(description))
        .trim()
        .to_string()
}

/// Collapse whitespace and drop control characters.
fn single_line(description: &str) -> String {
    let line = description
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if line.is_empty() {
        "an unspecified project".to_string()
    } else {
        line
    }
}
