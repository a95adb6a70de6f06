//! Server configuration and user settings
//!
//! Two layers of configuration exist. `ServerConfig` is the operator-facing
//! TOML file loaded once at startup. User-facing settings (provider choice,
//! endpoints, credentials) live in the key-value collaborator and are read
//! fresh on every translation call, because the settings surface that owns
//! the writes is a separate process.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::kv::KvStore;
use crate::provider::ProviderKind;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Interval between container re-acquisition attempts in milliseconds
    pub poll_interval_ms: u64,
}

impl PipelineConfig {
    /// Poll interval to hand to [`crate::pipeline::Pipeline::new`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Duration of one recorded chunk in seconds
    pub chunk_secs: u64,
}

impl AudioConfig {
    /// Chunk duration to hand to [`crate::audio::AudioPipeline::new`]
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs(self.chunk_secs)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { chunk_secs: 5 }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Pipeline configuration
    pub pipeline: PipelineConfig,

    /// Audio configuration
    pub audio: AudioConfig,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Path of the persisted key-value store. In-memory when absent.
    pub store_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3400,
            pipeline: PipelineConfig::default(),
            audio: AudioConfig::default(),
            cors_enabled: true,
            log_level: "info".to_string(),
            store_path: None,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Local-model provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSettings {
    pub endpoint: String,
    pub model_name: String,
}

/// Cloud provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSettings {
    pub api_key: Option<String>,
}

/// Transcription settings
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionSettings {
    pub api_key: Option<String>,
    /// Source-language hint for the transcriber
    pub language: String,
}

/// Snapshot of the user settings at one point in time.
/// Constructed per call, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub translation_enabled: bool,
    pub translation_provider: ProviderKind,
    pub font_size: u32,
    pub local: LocalSettings,
    pub cloud: CloudSettings,
    pub transcription: TranscriptionSettings,
}

/// Recognized settings keys. The settings surface owns the writes;
/// the pipeline reads with hardcoded defaults on absence.
pub mod keys {
    pub const TRANSLATION_ENABLED: &str = "translationEnabled";
    pub const TRANSLATION_PROVIDER: &str = "translationProvider";
    pub const FONT_SIZE: &str = "fontSize";
    pub const LOCAL_ENDPOINT: &str = "localEndpoint";
    pub const LOCAL_MODEL: &str = "localModel";
    pub const CLOUD_API_KEY: &str = "cloudApiKey";
    pub const TRANSCRIPTION_API_KEY: &str = "transcriptionApiKey";
    pub const TRANSCRIPTION_LANGUAGE: &str = "transcriptionLanguage";
}

/// Default local endpoint (Ollama's standard listen address)
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default local model identifier
pub const DEFAULT_LOCAL_MODEL: &str = "fast-trans";

/// Reads `Settings` snapshots from the key-value collaborator
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read a full settings snapshot
    pub fn snapshot(&self) -> Settings {
        Settings {
            translation_enabled: self
                .kv
                .get(keys::TRANSLATION_ENABLED)
                .map(|v| v == "true")
                .unwrap_or(false),
            translation_provider: self
                .kv
                .get(keys::TRANSLATION_PROVIDER)
                .and_then(|v| v.parse().ok())
                .unwrap_or(ProviderKind::Local),
            font_size: self
                .kv
                .get(keys::FONT_SIZE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            local: LocalSettings {
                endpoint: self
                    .kv
                    .get(keys::LOCAL_ENDPOINT)
                    .unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.to_string()),
                model_name: self
                    .kv
                    .get(keys::LOCAL_MODEL)
                    .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            },
            cloud: CloudSettings {
                api_key: self.kv.get(keys::CLOUD_API_KEY).filter(|k| !k.is_empty()),
            },
            transcription: TranscriptionSettings {
                api_key: self
                    .kv
                    .get(keys::TRANSCRIPTION_API_KEY)
                    .filter(|k| !k.is_empty()),
                language: self
                    .kv
                    .get(keys::TRANSCRIPTION_LANGUAGE)
                    .unwrap_or_else(|| "nl".to_string()),
            },
        }
    }
}
