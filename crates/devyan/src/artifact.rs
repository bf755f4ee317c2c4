use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use devyan_core::project::{sanitize, validate, FileRole, SanitizedArtifact, ValidationVerdict};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Debug, clap::Parser)]
#[command(name = "artifact")]
#[command(about = "Run the sanitizer and validator on a single file")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Print the sanitized body of a raw model response
    #[clap(name = "sanitize")]
    Sanitize(SanitizeOptions),

    /// Sanitize and validate a file; exits non-zero when it is not valid
    #[clap(name = "check")]
    Check(CheckOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct SanitizeOptions {
    /// File to read, or "-" for stdin
    pub file: PathBuf,

    /// architecture, code, tests or documentation; guessed from the file name when omitted
    #[arg(long)]
    pub role: Option<String>,
}

#[derive(Debug, clap::Args, Clone)]
pub struct CheckOptions {
    /// File to read, or "-" for stdin
    pub file: PathBuf,

    /// architecture, code, tests or documentation; guessed from the file name when omitted
    #[arg(long)]
    pub role: Option<String>,

    /// Output the verdict as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub file: String,
    pub role: FileRole,
    #[serde(flatten)]
    pub verdict: ValidationVerdict,
    pub bytes: usize,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Sanitize(options) => sanitize_handler(options, global).await,
        Commands::Check(options) => check_handler(options, global).await,
    }
}

/// Pick the role from `--role`, or from the file name.
pub fn resolve_role(role: Option<&str>, file: &Path) -> Result<FileRole> {
    match role {
        Some(name) => FileRole::parse(name).ok_or_else(|| Error::UnknownRole(name.to_string()).into()),
        None => file
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(FileRole::parse)
            .ok_or_else(|| Error::UnknownRole(file.display().to_string()).into()),
    }
}

async fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

/// Sanitize and validate the contents of `file`.
pub async fn check_file(file: &Path, role: FileRole) -> Result<SanitizedArtifact> {
    let raw = read_input(file).await?;
    Ok(validate(&sanitize(role, &raw)))
}

async fn sanitize_handler(options: SanitizeOptions, global: crate::Global) -> Result<()> {
    let role = resolve_role(options.role.as_deref(), &options.file)?;
    let raw = read_input(&options.file).await?;
    let artifact = sanitize(role, &raw);

    if global.verbose {
        eprintln!(
            "Sanitized {} as {}: {} -> {} bytes",
            options.file.display(),
            role,
            raw.len(),
            artifact.body.len()
        );
    }

    std::println!("{}", artifact.body);

    Ok(())
}

async fn check_handler(options: CheckOptions, global: crate::Global) -> Result<()> {
    let role = resolve_role(options.role.as_deref(), &options.file)?;
    let artifact = check_file(&options.file, role).await?;
    let verdict = artifact.verdict.clone().unwrap_or(ValidationVerdict::Empty);

    if global.verbose {
        eprintln!("Checking {} as {} ({:?})", options.file.display(), role, role.language());
    }

    if options.json {
        let output = CheckOutput {
            file: options.file.display().to_string(),
            role,
            verdict: verdict.clone(),
            bytes: artifact.body.len(),
        };
        std::println!("{}", serde_json::to_string_pretty(&output)?);
    } else if verdict.is_valid() {
        println!(
            "{} {} is valid {}",
            "✓".green().bold(),
            options.file.display().to_string().bright_white(),
            role
        );
    } else {
        println!(
            "{} {}: {}",
            "✗".red().bold(),
            options.file.display().to_string().bright_white(),
            verdict.reason().red()
        );
    }

    if verdict.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidVerdict {
            path: options.file.display().to_string(),
            role: role.to_string(),
            reason: verdict.reason(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_role_from_flag() {
        let role = resolve_role(Some("tests"), Path::new("whatever.txt")).unwrap();
        assert_eq!(role, FileRole::Tests);
    }

    #[test]
    fn test_role_from_file_name() {
        let role = resolve_role(None, Path::new("out/proj/README.md")).unwrap();
        assert_eq!(role, FileRole::Documentation);

        let role = resolve_role(None, Path::new("main.py")).unwrap();
        assert_eq!(role, FileRole::Code);
    }

    #[test]
    fn test_unknown_role() {
        let err = resolve_role(Some("poetry"), Path::new("main.py")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnknownRole(name)) if name == "poetry"
        ));

        assert!(resolve_role(None, Path::new("notes.txt")).is_err());
    }

    #[tokio::test]
    async fn test_check_fenced_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("response.txt");
        std::fs::write(&path, "```python\nprint('hi')\n```\n").unwrap();

        let artifact = check_file(&path, FileRole::Code).await.unwrap();

        assert_eq!(artifact.body, "print('hi')");
        assert_eq!(artifact.verdict, Some(ValidationVerdict::Valid));
    }

    #[tokio::test]
    async fn test_check_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.py");
        std::fs::write(&path, "def f(:\n pass\n").unwrap();

        let artifact = check_file(&path, FileRole::Code).await.unwrap();
        assert!(!artifact.is_valid());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = check_file(&dir.path().join("nope.py"), FileRole::Code)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_check_output_json() {
        let output = CheckOutput {
            file: "main.py".to_string(),
            role: FileRole::Code,
            verdict: ValidationVerdict::Empty,
            bytes: 0,
        };
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["verdict"], "empty");
        assert_eq!(json["role"], "code");
    }
}
