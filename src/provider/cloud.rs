//! Cloud provider
//!
//! Calls a hosted generative model with a fixed instruction prompt, low
//! temperature and a capped output length to keep latency and cost
//! bounded. A missing API key is a configuration error and is raised
//! before any network call.

use serde_json::json;

use crate::config::CloudSettings;
use crate::error::{RelayError, Result};

/// Hosted model API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const MODEL: &str = "gemini-2.0-flash";
const TEMPERATURE: f64 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 256;

const PROMPT_PREFIX: &str =
    "Translate the following Dutch subtitle text to English. Only return the translation, no explanations:\n\n";

/// Translate one caption through the hosted model
pub async fn translate(
    client: &reqwest::Client,
    settings: &CloudSettings,
    text: &str,
) -> Result<String> {
    translate_at(client, DEFAULT_BASE_URL, settings, text).await
}

/// Same as [`translate`] with an explicit API root, for tests
pub async fn translate_at(
    client: &reqwest::Client,
    base_url: &str,
    settings: &CloudSettings,
    text: &str,
) -> Result<String> {
    let api_key = settings.api_key.as_deref().ok_or_else(|| {
        RelayError::MissingCredential(
            "cloud API key not configured. Enter it in the settings panel.".to_string(),
        )
    })?;

    let url = format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        MODEL
    );
    let body = json!({
        "contents": [{ "parts": [{ "text": format!("{}{}", PROMPT_PREFIX, text) }] }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        }
    });

    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| RelayError::from_request(e, "cloud translation endpoint"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::ProviderError {
            status: status.as_u16(),
            body,
        });
    }

    let data: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

    let answer = data["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("")
        .trim()
        .to_string();
    if answer.is_empty() {
        Ok(text.to_string())
    } else {
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    fn with_key(key: &str) -> CloudSettings {
        CloudSettings {
            api_key: Some(key.to_string()),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = reqwest::Client::new();
        // Unreachable root: reaching it would fail differently, so the
        // error type proves no request was attempted.
        let err = translate_at(
            &client,
            "http://127.0.0.1:1",
            &CloudSettings { api_key: None },
            "Hallo daar",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_translate_success() {
        let app = Router::new().route(
            "/models/gemini-2.0-flash:generateContent",
            post(|| async {
                Json(serde_json::json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": " Hello there " }] }
                    }]
                }))
            }),
        );
        let base = serve(app).await;

        let client = reqwest::Client::new();
        let translated = translate_at(&client, &base, &with_key("secret"), "Hallo daar")
            .await
            .unwrap();
        assert_eq!(translated, "Hello there");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let app = Router::new().route(
            "/models/gemini-2.0-flash:generateContent",
            post(|| async { (axum::http::StatusCode::FORBIDDEN, "bad key") }),
        );
        let base = serve(app).await;

        let client = reqwest::Client::new();
        let err = translate_at(&client, &base, &with_key("bogus"), "Hallo daar")
            .await
            .unwrap_err();
        match err {
            RelayError::ProviderError { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_falls_back_to_source() {
        let app = Router::new().route(
            "/models/gemini-2.0-flash:generateContent",
            post(|| async { Json(serde_json::json!({ "candidates": [] })) }),
        );
        let base = serve(app).await;

        let client = reqwest::Client::new();
        let translated = translate_at(&client, &base, &with_key("secret"), "Hallo daar")
            .await
            .unwrap();
        assert_eq!(translated, "Hallo daar");
    }
}
