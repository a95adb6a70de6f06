//! Translation provider abstraction
//!
//! Two interchangeable backends produce translations: a local model
//! service (Ollama wire contract) and a hosted cloud model. The
//! `Translator` owns the cache-first dispatch; which backend serves a
//! call is read from the settings collaborator on every call, never
//! cached.

pub mod cloud;
pub mod local;

use std::str::FromStr;

use crate::cache::TranslationCache;
use crate::config::SettingsStore;
use crate::error::Result;

/// Which backend serves a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// User-hosted local model endpoint
    Local,
    /// Hosted cloud model
    Cloud,
}

impl ProviderKind {
    /// Stable identifier, also used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Cloud => "cloud",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local" => Ok(ProviderKind::Local),
            "cloud" => Ok(ProviderKind::Cloud),
            _ => Err(()),
        }
    }
}

/// Terminal value of one translation call
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub original: String,
    pub translated: String,
    pub served_from_cache: bool,
}

/// Cache-first translation dispatcher
#[derive(Clone)]
pub struct Translator {
    settings: SettingsStore,
    cache: TranslationCache,
    client: reqwest::Client,
}

impl Translator {
    pub fn new(settings: SettingsStore, cache: TranslationCache) -> Self {
        Self {
            settings,
            cache,
            client: reqwest::Client::new(),
        }
    }

    /// Translate one caption. Consults the cache before dispatching to
    /// the configured provider; a fresh result is written back to the
    /// cache before it is returned.
    pub async fn translate(&self, text: &str) -> Result<TranslationResult> {
        let settings = self.settings.snapshot();
        let kind = settings.translation_provider;

        if let Some(hit) = self.cache.get(kind.as_str(), text) {
            tracing::debug!(provider = kind.as_str(), "Cache hit");
            return Ok(TranslationResult {
                original: text.to_string(),
                translated: hit,
                served_from_cache: true,
            });
        }

        let translated = match kind {
            ProviderKind::Local => {
                local::translate(&self.client, &settings.local, text).await?
            }
            ProviderKind::Cloud => {
                cloud::translate(&self.client, &settings.cloud, text).await?
            }
        };

        self.cache.put(kind.as_str(), text, &translated);
        Ok(TranslationResult {
            original: text.to_string(),
            translated,
            served_from_cache: false,
        })
    }
}
