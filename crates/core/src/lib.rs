//! Core library for devyan
//!
//! This crate is the **Functional Core** of devyan. It decides what a model
//! response becomes: it strips the packaging models wrap around code, checks
//! the result parses, picks between retrying and falling back, and names the
//! project directory. Nothing here talks to a model or writes a project.
//!
//! - **`devyan_core`** (this crate): sanitizing, validation, prompts, retry decisions
//! - **`devyan`**: model calls, file writes and the command line (the Imperative Shell)
//!
//! # Module Organization
//!
//! - [`project`]: the generation pipeline for one project
//!   - [`project::sanitize`]: fence and prose removal per target language
//!   - [`project::validate`]: tree-sitter syntax check for Python
//!   - [`project::fallback`]: known-good bodies per file role
//!   - [`project::prompt`]: prompts, preambles and context excerpts
//!   - [`project::pipeline`]: the accept / retry / fall back decision
//!   - [`project::layout`]: project directory naming
//!   - [`project::report`]: the summary printed after a run
//! - [`settings`]: the optional TOML settings file
//!
//! # Example Usage
//!
//! ```rust
//! use devyan_core::project::{evaluate_attempt, FileRole, GenerationRequest, RetryPolicy, Step};
//!
//! let request = GenerationRequest::new("Say hello", FileRole::Code);
//! let raw = "Sure! Here is the code:\n```python\nprint('hello')\n```";
//!
//! match evaluate_attempt(&request, raw, 0, &RetryPolicy::default()) {
//!     Step::Accept(file) => assert_eq!(file.body(), "print('hello')"),
//!     other => panic!("unexpected step: {other:?}"),
//! }
//! ```

pub mod project;
pub mod settings;
