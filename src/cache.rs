//! Translation cache
//!
//! Content-addressed store over the key-value collaborator: the key is a
//! digest of the source text, qualified by the provider that produced the
//! translation, since wording differs between providers. Lookup and store
//! are independent calls; two concurrent misses for the same key may both
//! call the provider, and both write the same logical value. No eviction.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::kv::KvStore;

/// Prefix separating cache entries from settings in the shared store
const KEY_PREFIX: &str = "translation";

/// Digest length kept in the key. Half a SHA-256 is far beyond what
/// caption cardinality needs.
const DIGEST_HEX_LEN: usize = 32;

#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn KvStore>,
}

impl TranslationCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Deterministic cache key for `(provider, source text)`
    pub fn make_key(provider_id: &str, text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        let mut hex = String::with_capacity(DIGEST_HEX_LEN);
        for byte in digest.iter().take(DIGEST_HEX_LEN / 2) {
            hex.push_str(&format!("{:02x}", byte));
        }
        format!("{}:{}:{}", KEY_PREFIX, provider_id, hex)
    }

    /// Cached translation for `(provider, text)`, if any
    pub fn get(&self, provider_id: &str, text: &str) -> Option<String> {
        self.store.get(&Self::make_key(provider_id, text))
    }

    /// Store a translation. Idempotent overwrite.
    pub fn put(&self, provider_id: &str, text: &str, translated: &str) {
        self.store
            .put(&Self::make_key(provider_id, text), translated.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn cache() -> TranslationCache {
        TranslationCache::new(MemoryKv::shared())
    }

    #[test]
    fn test_roundtrip() {
        let cache = cache();
        assert_eq!(cache.get("local", "Hallo daar"), None);

        cache.put("local", "Hallo daar", "Hello there");
        assert_eq!(
            cache.get("local", "Hallo daar"),
            Some("Hello there".to_string())
        );
    }

    #[test]
    fn test_key_includes_provider() {
        let cache = cache();
        cache.put("local", "Hallo daar", "Hello there");

        // The other provider must not see the local provider's entry.
        assert_eq!(cache.get("cloud", "Hallo daar"), None);

        cache.put("cloud", "Hallo daar", "Hi there");
        assert_eq!(
            cache.get("local", "Hallo daar"),
            Some("Hello there".to_string())
        );
        assert_eq!(
            cache.get("cloud", "Hallo daar"),
            Some("Hi there".to_string())
        );
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = TranslationCache::make_key("local", "Hallo daar");
        let b = TranslationCache::make_key("local", "Hallo daar");
        assert_eq!(a, b);
        assert!(a.starts_with("translation:local:"));
    }

    #[test]
    fn test_distinct_texts_get_distinct_keys() {
        let a = TranslationCache::make_key("local", "een");
        let b = TranslationCache::make_key("local", "twee");
        assert_ne!(a, b);
    }

    #[test]
    fn test_overwrite_wins() {
        let cache = cache();
        cache.put("local", "Hallo", "Hello");
        cache.put("local", "Hallo", "Hello there");
        assert_eq!(cache.get("local", "Hallo"), Some("Hello there".to_string()));
    }
}
