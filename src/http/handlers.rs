//! HTTP request handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RelayError;
use crate::provider::local;
use crate::state::AppState;
use crate::transcribe;

/// HTTP error wrapper: the relay taxonomy mapped onto status codes,
/// with the message inline for the overlay to show.
#[derive(Debug)]
pub struct HttpError(RelayError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RelayError::MissingCredential(_) => StatusCode::BAD_REQUEST,
            RelayError::ProviderUnreachable(_)
            | RelayError::ProviderError { .. }
            | RelayError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
    pub cached: bool,
}

#[derive(Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct ProbeResponse {
    pub reachable: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("subrelay v", env!("CARGO_PKG_VERSION"))
}

/// Translate one caption
/// POST /translate
pub async fn translate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, HttpError> {
    let result = state.translator.translate(&request.text).await?;
    Ok(Json(TranslateResponse {
        translated: result.translated,
        cached: result.served_from_cache,
    }))
}

/// Transcribe an audio chunk and translate the transcript.
/// POST /transcribe with the raw encoded audio as the request body.
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    audio: Bytes,
) -> Result<Json<TranscribeResponse>, HttpError> {
    let settings = state.settings.snapshot();
    let transcription = transcribe::transcribe_at(
        &state.client,
        &state.transcribe_endpoint,
        &settings.transcription,
        audio,
    )
    .await?;

    if transcription.text.trim().is_empty() {
        return Ok(Json(TranscribeResponse {
            text: String::new(),
        }));
    }

    let translation = state.translator.translate(transcription.text.trim()).await?;
    Ok(Json(TranscribeResponse {
        text: translation.translated,
    }))
}

/// Check whether the configured local model server answers
/// GET /providers/local/health
pub async fn local_provider_health(
    State(state): State<Arc<AppState>>,
) -> Json<ProbeResponse> {
    let settings = state.settings.snapshot();
    let reachable = local::probe(&state.client, &settings.local.endpoint).await;
    Json(ProbeResponse { reachable })
}
