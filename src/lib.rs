//! Live subtitle translation relay
//!
//! Watches a player page's subtitle region for text changes, collapses
//! mutation bursts into discrete caption events, and translates each
//! caption through a pluggable provider with content-addressed caching.
//! An audio capture → transcription fallback feeds the same translation
//! step for sources without on-screen subtitles.
//!
//! The library exposes the pipeline; the server binary exposes the
//! stateless messaging boundary (`/translate`, `/transcribe`) that the
//! presentation layer talks to.

pub mod audio;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod http;
pub mod kv;
pub mod locate;
pub mod observe;
pub mod page;
pub mod pipeline;
pub mod provider;
pub mod selector;
pub mod state;
pub mod transcribe;

pub use error::{RelayError, Result};
pub use pipeline::{Pipeline, PipelineEvent};
pub use provider::{ProviderKind, TranslationResult, Translator};
