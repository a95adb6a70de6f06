//! Pipeline coordinator
//!
//! Wires locator → observer → debouncer → translator → output. The
//! subtitle container is a fundamentally unreliable signal: players
//! mount asynchronously and re-render at will, so the coordinator polls
//! until a container exists, observes it until it detaches, then goes
//! back to polling. Detachment is a transient state, never an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::SettingsStore;
use crate::debounce::{CaptionDebouncer, CaptionEvent};
use crate::locate::{self, SubtitleHandle};
use crate::observe;
use crate::page::Page;
use crate::provider::{TranslationResult, Translator};

/// What the pipeline hands to the overlay: a finished translation, or
/// an inline error string shown in place of the caption.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Translation(TranslationResult),
    Error(String),
}

/// The live caption pipeline for one subtitle surface
pub struct Pipeline {
    page: Page,
    settings: SettingsStore,
    translator: Arc<Translator>,
    poll_interval: Duration,
    out: mpsc::Sender<PipelineEvent>,
}

impl Pipeline {
    pub fn new(
        page: Page,
        settings: SettingsStore,
        translator: Translator,
        poll_interval: Duration,
        out: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            page,
            settings,
            translator: Arc::new(translator),
            poll_interval,
            out,
        }
    }

    /// Run until shutdown. Owns its debouncer: suppression state is
    /// scoped to this one pipeline, never shared across surfaces.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut debouncer = CaptionDebouncer::new();
        // Highest caption sequence (plus one) whose result was emitted.
        // Completions below it are stale and dropped.
        let newest_emitted = Arc::new(AtomicU64::new(0));

        loop {
            let handle = tokio::select! {
                handle = self.poll_for_container() => handle,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                    continue;
                }
            };
            tracing::info!(selector = handle.selector, "Observing subtitle container");

            let mut stream = observe::observe(&self.page, &handle);
            loop {
                tokio::select! {
                    snapshot = stream.recv() => {
                        match snapshot {
                            Some(text) => {
                                // The user can toggle translation off at
                                // any time; a disabled pipeline keeps
                                // watching but emits nothing.
                                if !self.settings.snapshot().translation_enabled {
                                    continue;
                                }
                                if let Some(event) = debouncer.reduce(&text) {
                                    self.dispatch(event, newest_emitted.clone());
                                }
                            }
                            // Container detached: release the stale
                            // observer before re-acquiring.
                            None => break,
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            stream.disconnect();
                            return;
                        }
                    }
                }
            }
            stream.disconnect();
            tracing::debug!("Subtitle container detached, resuming polling");
        }
    }

    async fn poll_for_container(&self) -> SubtitleHandle {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if let Some(handle) = locate::locate(&self.page) {
                return handle;
            }
        }
    }

    /// Translate one caption without blocking the mutation stream.
    /// Completion order is not emission order; a result that lands
    /// after a newer caption's result is dropped instead of overwriting
    /// the newer text on screen.
    fn dispatch(&self, event: CaptionEvent, newest_emitted: Arc<AtomicU64>) {
        tracing::debug!(seq = event.seq, text = %event.text, "Caption detected");
        let translator = self.translator.clone();
        let out = self.out.clone();

        tokio::spawn(async move {
            let result = translator.translate(&event.text).await;

            let tag = event.seq + 1;
            let prev = newest_emitted.fetch_max(tag, Ordering::SeqCst);
            if prev > tag {
                tracing::debug!(seq = event.seq, "Dropping stale translation result");
                return;
            }

            let out_event = match result {
                Ok(translation) => PipelineEvent::Translation(translation),
                Err(e) => PipelineEvent::Error(e.to_string()),
            };
            let _ = out.send(out_event).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TranslationCache;
    use crate::config::keys;
    use crate::kv::{KvStore, MemoryKv};
    use axum::routing::post;
    use axum::{Json, Router};

    /// Fake local model: answers "[en] {prompt}", slowly when the
    /// prompt contains "traag".
    async fn fake_local_model() -> String {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                let prompt = body["prompt"].as_str().unwrap_or("").to_string();
                if prompt.contains("traag") {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                }
                Json(serde_json::json!({"response": format!("[en] {}", prompt)}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn start_pipeline(
        page: &Page,
    ) -> (
        mpsc::Receiver<PipelineEvent>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let endpoint = fake_local_model().await;
        let kv = MemoryKv::shared();
        kv.put(keys::LOCAL_ENDPOINT, endpoint);
        kv.put(keys::TRANSLATION_ENABLED, "true".to_string());

        let settings = SettingsStore::new(kv.clone());
        let translator = Translator::new(settings.clone(), TranslationCache::new(kv));

        let (tx, rx) = mpsc::channel(16);
        let pipeline = Pipeline::new(
            page.clone(),
            settings,
            translator,
            Duration::from_millis(20),
            tx,
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(pipeline.run(stop_rx));
        (rx, stop_tx, task)
    }

    fn add_container(page: &Page, text: &str) -> crate::page::NodeId {
        let overlay = page.create_element_with_classes("div", &["bmpui-ui-subtitle-overlay"]);
        page.append_child(page.root(), overlay);
        page.set_text(overlay, text);
        overlay
    }

    async fn next_event(rx: &mut mpsc::Receiver<PipelineEvent>) -> PipelineEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("pipeline should emit")
            .unwrap()
    }

    fn translated(event: PipelineEvent) -> TranslationResult {
        match event {
            PipelineEvent::Translation(t) => t,
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_container_appearing_after_start_is_picked_up() {
        let page = Page::new();
        let (mut rx, stop_tx, task) = start_pipeline(&page).await;

        // The container mounts only after the pipeline began polling.
        tokio::time::sleep(Duration::from_millis(60)).await;
        add_container(&page, "Hallo daar");

        let result = translated(next_event(&mut rx).await);
        assert_eq!(result.original, "Hallo daar");
        assert_eq!(result.translated, "[en] Hallo daar");
        assert!(!result.served_from_cache);

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_burst_translates_once_and_cache_serves_repeats() {
        let page = Page::new();
        let (mut rx, stop_tx, task) = start_pipeline(&page).await;

        let overlay = add_container(&page, "Hallo daar");
        let first = translated(next_event(&mut rx).await);
        assert_eq!(first.translated, "[en] Hallo daar");

        // An identical mutation burst is suppressed by the debouncer.
        page.set_text(overlay, "Hallo daar");
        page.set_text(overlay, " Hallo  daar ");

        page.set_text(overlay, "Tot ziens");
        let second = translated(next_event(&mut rx).await);
        assert_eq!(second.original, "Tot ziens");

        // The first line returning is a new caption event, but the
        // translation now comes from the cache.
        page.set_text(overlay, "Hallo daar");
        let third = translated(next_event(&mut rx).await);
        assert_eq!(third.translated, "[en] Hallo daar");
        assert!(third.served_from_cache);

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reacquires_after_container_detach() {
        let page = Page::new();
        let (mut rx, stop_tx, task) = start_pipeline(&page).await;

        let overlay = add_container(&page, "eerste regel");
        assert_eq!(
            translated(next_event(&mut rx).await).original,
            "eerste regel"
        );

        // Player re-render: the container disappears, a new one mounts.
        page.remove(overlay);
        tokio::time::sleep(Duration::from_millis(60)).await;
        add_container(&page, "tweede regel");

        assert_eq!(
            translated(next_event(&mut rx).await).original,
            "tweede regel"
        );

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_result_does_not_overwrite_newer() {
        let page = Page::new();
        let (mut rx, stop_tx, task) = start_pipeline(&page).await;

        let overlay = add_container(&page, "traag antwoord");
        // Give the observer time to pick up the slow caption first.
        tokio::time::sleep(Duration::from_millis(100)).await;
        page.set_text(overlay, "snel antwoord");

        // The fast caption's translation lands first.
        let first = translated(next_event(&mut rx).await);
        assert_eq!(first.original, "snel antwoord");

        // The slow one resolves afterwards and must be dropped.
        let late = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
        assert!(late.is_err(), "stale result was emitted: {:?}", late);

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_error_event() {
        let page = Page::new();
        let kv = MemoryKv::shared();
        // Nothing listens here; the provider call fails at connect.
        kv.put(keys::LOCAL_ENDPOINT, "http://127.0.0.1:1".to_string());
        kv.put(keys::TRANSLATION_ENABLED, "true".to_string());

        let settings = SettingsStore::new(kv.clone());
        let translator = Translator::new(settings.clone(), TranslationCache::new(kv));
        let (tx, mut rx) = mpsc::channel(16);
        let pipeline = Pipeline::new(
            page.clone(),
            settings,
            translator,
            Duration::from_millis(20),
            tx,
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(pipeline.run(stop_rx));

        add_container(&page, "Hallo daar");
        match next_event(&mut rx).await {
            PipelineEvent::Error(msg) => {
                assert!(msg.contains("Is the local model server running?"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_pipeline_translates_nothing() {
        let page = Page::new();
        let endpoint = fake_local_model().await;
        let kv = MemoryKv::shared();
        kv.put(keys::LOCAL_ENDPOINT, endpoint);
        // translationEnabled is left unset: disabled is the default.

        let settings = SettingsStore::new(kv.clone());
        let translator = Translator::new(settings.clone(), TranslationCache::new(kv));
        let (tx, mut rx) = mpsc::channel(16);
        let pipeline = Pipeline::new(
            page.clone(),
            settings,
            translator,
            Duration::from_millis(20),
            tx,
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(pipeline.run(stop_rx));

        add_container(&page, "Hallo daar");
        let nothing = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(nothing.is_err(), "disabled pipeline emitted: {:?}", nothing);

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_while_polling() {
        let page = Page::new();
        let (_rx, stop_tx, task) = start_pipeline(&page).await;

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pipeline should stop promptly")
            .unwrap();
    }
}
