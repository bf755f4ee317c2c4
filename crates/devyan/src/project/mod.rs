use crate::prelude::*;
use std::path::PathBuf;

pub mod generate;
pub mod writer;

#[derive(Debug, clap::Parser)]
#[command(name = "project")]
#[command(about = "Generate a project with a local Ollama model")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Generate architecture.md, main.py, test_main.py and README.md from a request
    #[clap(name = "generate")]
    Generate(GenerateOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct GenerateOptions {
    /// What the project should do, in plain language
    pub description: String,

    /// Directory the project folder is created in [default: projects]
    #[arg(long, env = "DEVYAN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Model name for generation [default: llama3.1:8b]
    #[arg(long, env = "DEVYAN_MODEL")]
    pub model: Option<String>,

    /// Ollama base URL [default: http://localhost:11434]
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Corrective retries per file before the fallback is used [default: 1]
    #[arg(long, env = "DEVYAN_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Settings file to read instead of <config_dir>/devyan/config.toml
    #[arg(long, env = "DEVYAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Generate(options) => generate::handler(options, global).await,
    }
}
