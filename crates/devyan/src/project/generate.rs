use crate::config::DevyanConfig;
use crate::model::{check_reachable, OllamaModel, TextModel};
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use devyan_core::project::{
    build_prompt, context_source, evaluate_attempt, excerpt, preamble, project_path, FileOrigin,
    FileRole, GenerationEvent, GenerationRequest, ProjectReport, ResolvedFile, RetryPolicy, Step,
    WrittenFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

use super::writer::write_project;
use super::GenerateOptions;

/// Resolve one file: prompt, evaluate, and retry until accepted or fallen back.
///
/// Model errors are returned as they are and never retried.
pub async fn resolve_file<M: TextModel>(
    model: &M,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    on_event: &mut impl FnMut(GenerationEvent),
) -> Result<ResolvedFile> {
    let role = request.role;
    let preamble = preamble(role);
    let mut prompt = build_prompt(request);
    let mut attempt = 0;

    on_event(GenerationEvent::Started { role });

    loop {
        let raw = model.complete(preamble, &prompt).await?;

        match evaluate_attempt(request, &raw, attempt, policy) {
            Step::Accept(file) => {
                on_event(GenerationEvent::Accepted {
                    role,
                    attempts: attempt + 1,
                });
                return Ok(file);
            }
            Step::Retry {
                prompt: corrective,
                verdict,
            } => {
                attempt += 1;
                log::warn!("{} rejected on attempt {}: {}", role, attempt, verdict.reason());
                on_event(GenerationEvent::Retrying {
                    role,
                    attempt,
                    reason: verdict.reason(),
                });
                prompt = corrective;
            }
            Step::Fallback(file) => {
                let reason = match file.origin() {
                    FileOrigin::Fallback { verdict } => verdict.reason(),
                    FileOrigin::Generated { .. } => String::new(),
                };
                log::warn!("{} falls back after {} attempts: {}", role, attempt + 1, reason);
                on_event(GenerationEvent::FellBack { role, reason });
                return Ok(file);
            }
        }
    }
}

/// Resolve every role in order, feeding each one the excerpt it expects.
pub async fn generate_project<M: TextModel>(
    model: &M,
    description: &str,
    policy: &RetryPolicy,
    on_event: &mut impl FnMut(GenerationEvent),
) -> Result<Vec<ResolvedFile>> {
    let mut resolved: Vec<ResolvedFile> = Vec::with_capacity(FileRole::ALL.len());

    for role in FileRole::ALL {
        let mut request = GenerationRequest::new(description, role);

        if let Some((source, max_chars)) = context_source(role) {
            if let Some(file) = resolved.iter().find(|f| f.role() == source) {
                request = request.with_context(excerpt(source, file.body(), max_chars));
            }
        }

        resolved.push(resolve_file(model, &request, policy, on_event).await?);
    }

    Ok(resolved)
}

/// Generate the whole project, then write it. Nothing touches the disk unless
/// every role resolved.
pub async fn create_project<M: TextModel>(
    model: &M,
    description: &str,
    policy: &RetryPolicy,
    project_dir: &Path,
    on_event: &mut impl FnMut(GenerationEvent),
) -> Result<Vec<WrittenFile>> {
    let files = generate_project(model, description, policy, on_event).await?;
    write_project(project_dir, &files, on_event).await
}

/// Handle `devyan project generate`
pub async fn handler(options: GenerateOptions, global: crate::Global) -> Result<()> {
    let description = options.description.trim().to_string();
    if description.is_empty() {
        return Err(eyre!("The project description must not be empty"));
    }

    let config = DevyanConfig::load(options.config.as_deref())?.with_overrides(
        options.ollama_url,
        options.model,
        options.max_retries,
        options.output_dir,
    );

    if global.verbose {
        eprintln!("Ollama URL: {}", config.ollama_url);
        eprintln!("Model: {}", config.model);
        eprintln!("Max retries: {}", config.max_retries);
        eprintln!("Output directory: {}", config.output_dir.display());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| eyre!("Invalid spinner template: {}", e))?,
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let started = Instant::now();
    let project_dir = project_path(
        &config.output_dir,
        &description,
        chrono::Local::now().naive_local(),
    );

    let result = async {
        spinner.set_message(format!("Checking Ollama at {}", config.ollama_url));
        let version = check_reachable(&config.ollama_url).await?;
        if global.verbose {
            spinner.suspend(|| eprintln!("Ollama version: {}", version));
        }

        let model = OllamaModel::new(&config.ollama_url, &config.model)?;
        let policy = config.retry_policy();
        let mut on_event = |event: GenerationEvent| show_event(&spinner, &event);

        create_project(&model, &description, &policy, &project_dir, &mut on_event).await
    }
    .await;

    spinner.finish_and_clear();

    let report = ProjectReport::new(
        project_dir.display().to_string(),
        result?,
        started.elapsed().as_millis() as u64,
    );

    if options.json {
        std::println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn show_event(spinner: &ProgressBar, event: &GenerationEvent) {
    match event {
        GenerationEvent::Started { role } => {
            spinner.set_message(format!("Generating {}", role.file_name()));
        }
        GenerationEvent::Retrying {
            role,
            attempt,
            reason,
        } => spinner.suspend(|| {
            eprintln!(
                "{} {} rejected ({}), retry {}",
                "!".yellow().bold(),
                role.file_name().bright_white(),
                reason,
                attempt
            )
        }),
        GenerationEvent::Accepted { role, attempts } => spinner.suspend(|| {
            eprintln!(
                "{} {} generated ({})",
                "✓".green().bold(),
                role.file_name().bright_white(),
                plural(*attempts, "attempt")
            )
        }),
        GenerationEvent::FellBack { role, reason } => spinner.suspend(|| {
            eprintln!(
                "{} {} uses the fallback template ({})",
                "!".yellow().bold(),
                role.file_name().bright_white(),
                reason
            )
        }),
        GenerationEvent::Written { role, bytes } => {
            spinner.set_message(format!("Wrote {} ({} bytes)", role.file_name(), bytes));
        }
    }
}

fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn format_origin(origin: &FileOrigin) -> String {
    match origin {
        FileOrigin::Generated { attempts } => {
            format!("generated, {}", plural(*attempts, "attempt"))
                .green()
                .to_string()
        }
        FileOrigin::Fallback { verdict } => format!("fallback: {}", verdict.reason())
            .yellow()
            .to_string(),
    }
}

fn print_report(report: &ProjectReport) {
    println!("\n{}", label("== Project =="));
    println!("\n{}\n", report.project_dir.bright_white());

    let mut table = new_table();
    table.add_row(prettytable::row![
        label("File"),
        label("Bytes"),
        label("Origin")
    ]);
    for file in &report.files {
        table.add_row(prettytable::row![
            file.file_name.bright_white(),
            file.bytes.to_string().bright_yellow(),
            format_origin(&file.origin)
        ]);
    }
    table.printstd();

    let rate = format!("{:.1}%", report.success_rate);
    let mut summary = new_table();
    summary.add_row(prettytable::row![
        label("Success rate"),
        if report.is_complete() {
            rate.green().to_string()
        } else {
            rate.red().to_string()
        }
    ]);
    summary.add_row(prettytable::row![
        label("Total size"),
        format!("{} bytes", report.total_bytes)
    ]);
    summary.add_row(prettytable::row![
        label("Fallbacks"),
        report.fallbacks.to_string()
    ]);
    summary.add_row(prettytable::row![
        label("Elapsed"),
        format!("{:.1}s", report.elapsed_ms as f64 / 1000.0)
    ]);
    println!();
    summary.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use devyan_core::project::{fallback_body, ValidationVerdict};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replays canned responses and records every prompt it was given.
    struct ScriptedModel {
        responses: Mutex<VecDeque<std::result::Result<&'static str, &'static str>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<std::result::Result<&'static str, &'static str>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextModel for ScriptedModel {
        async fn complete(&self, _preamble: &str, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());

            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(reason)) => Err(Error::ModelUnreachable {
                    url: "scripted".to_string(),
                    reason: reason.to_string(),
                }
                .into()),
                None => Err(eyre!("script exhausted")),
            }
        }
    }

    const ARCHITECTURE: &str = "# Architecture Document\n\n## Project Overview\nGreets people.";
    const CODE: &str = "Here is the code:\n```python\nprint('hi')\n```";
    const TESTS: &str = "```python\nimport unittest\n\nclass T(unittest.TestCase):\n    pass\n```";
    const README: &str = "# Greeter\n\nSays hi.";

    #[tokio::test]
    async fn test_clean_run_accepts_every_file() {
        let model = ScriptedModel::new(vec![Ok(ARCHITECTURE), Ok(CODE), Ok(TESTS), Ok(README)]);
        let mut events = Vec::new();

        let files = generate_project(&model, "Say hi", &RetryPolicy::default(), &mut |e| {
            events.push(e)
        })
        .await
        .unwrap();

        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| !f.is_fallback()));
        assert_eq!(files[1].body(), "print('hi')");
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GenerationEvent::Accepted { attempts: 1, .. }))
                .count(),
            4
        );

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[1].contains("Excerpt of architecture.md:\n# Architecture Document"));
        assert!(prompts[2].contains("Excerpt of main.py:\nprint('hi')"));
        assert!(!prompts[3].contains("Excerpt of"));
    }

    #[tokio::test]
    async fn test_malformed_code_retries_then_falls_back() {
        let model = ScriptedModel::new(vec![
            Ok(ARCHITECTURE),
            Ok("def f(:\n pass"),
            Ok("def f(:\n pass"),
            Ok(TESTS),
            Ok(README),
        ]);
        let mut events = Vec::new();

        let files = generate_project(&model, "Say hi", &RetryPolicy::default(), &mut |e| {
            events.push(e)
        })
        .await
        .unwrap();

        assert_eq!(files[1].body(), fallback_body(FileRole::Code, "Say hi"));
        assert!(matches!(
            files[1].origin(),
            FileOrigin::Fallback {
                verdict: ValidationVerdict::SyntaxError(_)
            }
        ));

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 5);
        assert!(prompts[2].contains("Your previous response was rejected: syntax error"));
        // The tests prompt sees the fallback code, not the rejected response
        assert!(prompts[3].contains("Excerpt of main.py:\n#!/usr/bin/env python3"));

        assert!(events.iter().any(|e| matches!(
            e,
            GenerationEvent::Retrying {
                role: FileRole::Code,
                attempt: 1,
                ..
            }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            GenerationEvent::FellBack {
                role: FileRole::Code,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_corrected_retry_is_accepted() {
        let model = ScriptedModel::new(vec![Ok("print('hi'"), Ok("print('hi')")]);
        let request = GenerationRequest::new("Say hi", FileRole::Code);

        let file = resolve_file(&model, &request, &RetryPolicy::default(), &mut |_| {})
            .await
            .unwrap();

        assert_eq!(file.body(), "print('hi')");
        assert_eq!(file.origin(), &FileOrigin::Generated { attempts: 2 });
    }

    #[tokio::test]
    async fn test_retry_budget_is_respected() {
        let model = ScriptedModel::new(vec![Ok(""), Ok(""), Ok(""), Ok("")]);
        let request = GenerationRequest::new("Docs", FileRole::Documentation);

        let file = resolve_file(&model, &request, &RetryPolicy::new(2), &mut |_| {})
            .await
            .unwrap();

        assert!(file.is_fallback());
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_model_error_aborts_and_writes_nothing() {
        let model = ScriptedModel::new(vec![Ok(ARCHITECTURE), Err("connection refused")]);
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join("say_hi_20250101_000000");

        let err = create_project(
            &model,
            "Say hi",
            &RetryPolicy::default(),
            &project_dir,
            &mut |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ModelUnreachable { .. })
        ));
        assert!(!project_dir.exists());
        assert_eq!(model.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_create_project_writes_resolved_bodies() {
        let model = ScriptedModel::new(vec![
            Ok(ARCHITECTURE),
            Ok("```python\nprint('hi')\n```"),
            Ok(TESTS),
            Ok(README),
        ]);
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join("say_hi_20250101_000000");

        let written = create_project(
            &model,
            "Say hi",
            &RetryPolicy::default(),
            &project_dir,
            &mut |_| {},
        )
        .await
        .unwrap();

        assert_eq!(written.len(), 4);
        assert_eq!(
            std::fs::read_to_string(project_dir.join("main.py")).unwrap(),
            "print('hi')"
        );

        let report = ProjectReport::new(project_dir.display().to_string(), written, 10);
        assert!(report.is_complete());
        assert_eq!(report.fallbacks, 0);
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "attempt"), "1 attempt");
        assert_eq!(plural(2, "attempt"), "2 attempts");
    }
}
