//! Application state
//!
//! Shared by all HTTP handlers: the server configuration, the settings
//! reader over the key-value collaborator, and the cache-first
//! translator built on top of it.

use std::sync::Arc;

use crate::cache::TranslationCache;
use crate::config::{ServerConfig, SettingsStore};
use crate::kv::{KvStore, MemoryKv};
use crate::provider::Translator;
use crate::transcribe;

pub struct AppState {
    pub config: ServerConfig,
    pub settings: SettingsStore,
    pub translator: Translator,
    /// HTTP client for transcription uploads
    pub client: reqwest::Client,
    /// Transcription endpoint, overridable in tests
    pub transcribe_endpoint: String,
}

impl AppState {
    pub fn new(config: ServerConfig, kv: Arc<dyn KvStore>) -> Self {
        let settings = SettingsStore::new(kv.clone());
        let translator = Translator::new(settings.clone(), TranslationCache::new(kv));
        Self {
            config,
            settings,
            translator,
            client: reqwest::Client::new(),
            transcribe_endpoint: transcribe::DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default(), MemoryKv::shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::with_defaults();
        assert_eq!(state.config.port, 3400);
        assert_eq!(state.transcribe_endpoint, transcribe::DEFAULT_ENDPOINT);
    }
}
