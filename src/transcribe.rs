//! Audio transcription
//!
//! Uploads a bounded audio chunk to a hosted Whisper-style endpoint as a
//! multipart form, with a fixed source-language hint. Used only by the
//! audio fallback pipeline; on-screen subtitles never pass through here.

use bytes::Bytes;
use serde::Deserialize;

use crate::config::TranscriptionSettings;
use crate::error::{RelayError, Result};

/// Hosted transcription endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

const MODEL: &str = "whisper-1";

/// Result of transcribing one audio chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub language: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
}

/// Transcribe one audio chunk
pub async fn transcribe(
    client: &reqwest::Client,
    settings: &TranscriptionSettings,
    audio: Bytes,
) -> Result<Transcription> {
    transcribe_at(client, DEFAULT_ENDPOINT, settings, audio).await
}

/// Same as [`transcribe`] with an explicit endpoint, for tests
pub async fn transcribe_at(
    client: &reqwest::Client,
    endpoint: &str,
    settings: &TranscriptionSettings,
    audio: Bytes,
) -> Result<Transcription> {
    let api_key = settings.api_key.as_deref().ok_or_else(|| {
        RelayError::MissingCredential(
            "transcription API key not configured. Enter it in the settings panel.".to_string(),
        )
    })?;

    let file = reqwest::multipart::Part::bytes(audio.to_vec())
        .file_name("audio.webm")
        .mime_str("audio/webm")
        .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
    let form = reqwest::multipart::Form::new()
        .part("file", file)
        .text("model", MODEL)
        .text("language", settings.language.clone())
        .text("response_format", "json");

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .multipart(form)
        .send()
        .await
        .map_err(|e| RelayError::from_request(e, "transcription endpoint"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::ProviderError {
            status: status.as_u16(),
            body,
        });
    }

    let data: TranscriptionResponse = response
        .json()
        .await
        .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

    Ok(Transcription {
        text: data.text.unwrap_or_default(),
        language: settings.language.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    fn settings(key: Option<&str>) -> TranscriptionSettings {
        TranscriptionSettings {
            api_key: key.map(|k| k.to_string()),
            language: "nl".to_string(),
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
        let err = transcribe_at(
            &client,
            "http://127.0.0.1:1/v1/audio/transcriptions",
            &settings(None),
            Bytes::from_static(b"opus"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { Json(serde_json::json!({"text": "Hallo daar"})) }),
        );
        let base = serve(app).await;

        let client = reqwest::Client::new();
        let result = transcribe_at(
            &client,
            &format!("{}/v1/audio/transcriptions", base),
            &settings(Some("secret")),
            Bytes::from_static(b"opus-data"),
        )
        .await
        .unwrap();
        assert_eq!(result.text, "Hallo daar");
        assert_eq!(result.language, "nl");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let app = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let base = serve(app).await;

        let client = reqwest::Client::new();
        let err = transcribe_at(
            &client,
            &format!("{}/v1/audio/transcriptions", base),
            &settings(Some("secret")),
            Bytes::from_static(b"opus"),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            RelayError::ProviderError { status: 429, .. }
        ));
    }
}
