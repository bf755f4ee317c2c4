use crate::prelude::*;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::ollama;
use serde::Deserialize;
use std::time::Duration;

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that turns a preamble and a prompt into raw text.
///
/// Any error returned here is treated as the model being unreachable and ends
/// the run.
pub trait TextModel {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String>;
}

/// Completions served by an Ollama instance through rig.
pub struct OllamaModel {
    client: ollama::Client,
    url: String,
    model: String,
}

impl OllamaModel {
    pub fn new(url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(url)?,
            url: url.to_string(),
            model: model.to_string(),
        })
    }
}

impl TextModel for OllamaModel {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String> {
        let agent = self.client.agent(&self.model).preamble(preamble).build();

        log::debug!(
            "Prompting {} ({} chars, preamble {} chars)",
            self.model,
            prompt.len(),
            preamble.len()
        );

        let response = agent.prompt(prompt.to_string()).await.map_err(|e| {
            Error::ModelUnreachable {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        log::debug!("Model returned {} chars", response.len());
        Ok(response)
    }
}

fn create_client(ollama_url: &str) -> Result<ollama::Client> {
    use rig::client::Nothing;

    ollama::Client::builder()
        .api_key(Nothing)
        .base_url(ollama_url)
        .build()
        .map_err(|e| eyre!("Failed to create Ollama client: {}", e))
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Request `GET <url>/api/version` and return the server version.
pub async fn check_reachable(ollama_url: &str) -> Result<String> {
    let endpoint = format!("{}/api/version", ollama_url.trim_end_matches('/'));
    let unreachable = |reason: String| Error::ModelUnreachable {
        url: ollama_url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(VERSION_TIMEOUT)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    let response = client
        .get(&endpoint)
        .send()
        .await
        .map_err(|e| unreachable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(unreachable(format!("{} returned {}", endpoint, response.status())).into());
    }

    let version: VersionResponse = response
        .json()
        .await
        .map_err(|e| unreachable(format!("unexpected response from {}: {}", endpoint, e)))?;

    log::debug!("Ollama {} is up at {}", version.version, ollama_url);
    Ok(version.version)
}
