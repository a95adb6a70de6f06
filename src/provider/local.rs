//! Local-model provider
//!
//! Talks to a user-hosted model server over the Ollama generate
//! contract: `POST {endpoint}/api/generate` with a non-streaming
//! request, low temperature and a bounded prediction length. Some local
//! models wrap their answer in `<think>` reasoning markup, which is
//! stripped before the translation is returned.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::LocalSettings;
use crate::error::{RelayError, Result};

const TEMPERATURE: f64 = 0.1;
const NUM_PREDICT: u32 = 256;

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Translate one caption through the local model. The model's own
/// system prompt carries the translation instructions, so the caption
/// is sent as-is.
pub async fn translate(
    client: &reqwest::Client,
    settings: &LocalSettings,
    text: &str,
) -> Result<String> {
    let url = format!("{}/api/generate", settings.endpoint.trim_end_matches('/'));
    let request = GenerateRequest {
        model: &settings.model_name,
        prompt: text,
        stream: false,
        options: GenerateOptions {
            temperature: TEMPERATURE,
            num_predict: NUM_PREDICT,
        },
    };

    let response = client.post(&url).json(&request).send().await.map_err(|e| {
        RelayError::ProviderUnreachable(format!(
            "connection to {} failed: {}. Is the local model server running?",
            settings.endpoint, e
        ))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::ProviderError {
            status: status.as_u16(),
            body,
        });
    }

    let data: GenerateResponse = response
        .json()
        .await
        .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

    let cleaned = strip_reasoning(data.response.as_deref().unwrap_or(""))
        .trim()
        .to_string();
    if cleaned.is_empty() {
        // A model that answers nothing usable: fall back to the source
        // line rather than blanking the overlay.
        Ok(text.to_string())
    } else {
        Ok(cleaned)
    }
}

/// Check whether the local model server answers at all
pub async fn probe(client: &reqwest::Client, endpoint: &str) -> bool {
    let url = format!("{}/api/tags", endpoint.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Remove `<think>...</think>` reasoning blocks from a model answer
fn strip_reasoning(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
    re.replace_all(text, "").to_string()
}
