//! Scripted remote fetcher.

use async_trait::async_trait;
use bytes::Bytes;
use cutroom_core::{MediaError, MediaResult};
use cutroom_media::{FetchProgress, FetchedPayload, ProgressSender, RemoteFetcher};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub enum Script {
    Respond {
        body: Vec<u8>,
        content_type: Option<String>,
    },
    Fail(MediaError),
    /// Never completes on its own; returns once the caller cancels.
    Hang,
    /// Completes, but the caller's token is cancelled just before returning,
    /// as if the user navigated away while the last chunk arrived.
    RespondThenCancel { body: Vec<u8> },
}

#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn script(&self, url: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    pub fn respond(&self, url: &str, body: Vec<u8>, content_type: Option<&str>) {
        self.script(
            url,
            Script::Respond {
                body,
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<FetchedPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Script::Fail(MediaError::FetchFailed(format!("{} returned status code 404", url))));

        match script {
            Script::Respond { body, content_type } => {
                if let Some(tx) = progress {
                    let half = (body.len() / 2) as u64;
                    let _ = tx.send(FetchProgress {
                        received: half,
                        total: Some(body.len() as u64),
                    });
                    let _ = tx.send(FetchProgress {
                        received: body.len() as u64,
                        total: Some(body.len() as u64),
                    });
                }
                Ok(FetchedPayload {
                    bytes: Bytes::from(body),
                    content_type,
                })
            }
            Script::Fail(error) => Err(error),
            Script::Hang => {
                cancel.cancelled().await;
                Err(MediaError::Cancelled)
            }
            Script::RespondThenCancel { body } => {
                cancel.cancel();
                Ok(FetchedPayload {
                    bytes: Bytes::from(body),
                    content_type: None,
                })
            }
        }
    }
}
