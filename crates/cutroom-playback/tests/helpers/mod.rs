//! Test helpers: scriptable media elements and an in-memory resolver.

#![allow(dead_code)]

use async_trait::async_trait;
use cutroom_core::models::ProjectId;
use cutroom_core::{MediaError, MediaResult};
use cutroom_media::{FetchedPayload, ProgressSender, ReferenceResolver, RemoteFetcher};
use cutroom_playback::MediaElement;
use cutroom_storage::{ContentStore, MemoryStore};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub source: Option<String>,
    pub paused: bool,
    pub time: f64,
    pub muted: bool,
    pub volume: f32,
    pub duration: Option<f64>,
    pub seeks: Vec<f64>,
}

/// Element whose clock the test moves by hand. Clones share state, so the
/// test keeps one copy while the session owns another.
#[derive(Clone)]
pub struct FakeElement(Arc<Mutex<ElementState>>);

impl FakeElement {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(ElementState {
            paused: true,
            volume: 1.0,
            ..Default::default()
        })))
    }

    pub fn state(&self) -> MutexGuard<'_, ElementState> {
        self.0.lock().unwrap()
    }

    pub fn set_time(&self, secs: f64) {
        self.state().time = secs;
    }

    pub fn time(&self) -> f64 {
        self.state().time
    }

    pub fn boxed(&self) -> Box<dyn MediaElement> {
        Box::new(self.clone())
    }
}

impl MediaElement for FakeElement {
    fn set_source(&mut self, url: Option<&str>) {
        let mut state = self.state();
        state.source = url.map(str::to_string);
        state.time = 0.0;
    }

    fn has_source(&self) -> bool {
        self.state().source.is_some()
    }

    fn play(&mut self) {
        self.state().paused = false;
    }

    fn pause(&mut self) {
        self.state().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }

    fn current_time(&self) -> f64 {
        self.state().time
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state();
        state.time = secs;
        state.seeks.push(secs);
    }

    fn set_muted(&mut self, muted: bool) {
        self.state().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state().muted
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state().volume
    }

    fn duration(&self) -> Option<f64> {
        self.state().duration
    }
}

/// Fetcher that never completes until cancelled.
pub struct StalledFetcher;

#[async_trait]
impl RemoteFetcher for StalledFetcher {
    async fn fetch(
        &self,
        _url: &str,
        _progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<FetchedPayload> {
        cancel.cancelled().await;
        Err(MediaError::Cancelled)
    }
}

pub fn resolver_with_store(store: Arc<dyn ContentStore>) -> Arc<ReferenceResolver> {
    Arc::new(ReferenceResolver::new(
        store,
        Arc::new(StalledFetcher),
        ProjectId::new(),
    ))
}

pub fn memory_resolver() -> (Arc<dyn ContentStore>, Arc<ReferenceResolver>) {
    let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
    let resolver = resolver_with_store(store.clone());
    (store, resolver)
}

pub fn webm_bytes() -> Vec<u8> {
    vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x86, 0x81, 0x01, 0x00]
}
