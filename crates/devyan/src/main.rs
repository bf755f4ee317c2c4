use crate::prelude::*;
use clap::Parser;

mod artifact;
mod config;
mod error;
mod model;
mod prelude;
mod project;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Generate small Python projects with a local Ollama model, keeping only output that parses"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "DEVYAN_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Generate a project from a natural-language request
    Project(crate::project::App),

    /// Sanitize and check a single generated file
    Artifact(crate::artifact::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Project(sub_app) => crate::project::run(sub_app, app.global).await,
        SubCommands::Artifact(sub_app) => crate::artifact::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
