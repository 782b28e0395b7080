//! Remote retrieval with progress and cancellation

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cutroom_core::{MediaError, MediaResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Byte-level progress of one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub received: u64,
    /// `Content-Length`, when the server sent one.
    pub total: Option<u64>,
}

impl FetchProgress {
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => {
                Some(((self.received.min(total) * 100) / total) as u8)
            }
            _ => None,
        }
    }

    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self.percent() {
            Some(percent) => format!("Downloading video... {}%", percent),
            None => format!(
                "Downloading video... {:.1} MB",
                self.received as f64 / BYTES_PER_MB
            ),
        }
    }
}

pub type ProgressSender = mpsc::UnboundedSender<FetchProgress>;

#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Download `url`. Must return [`MediaError::Cancelled`] promptly once
    /// `cancel` fires and must not report progress after that.
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<FetchedPayload>;
}

/// Map an HTTP status to the error taxonomy.
pub fn classify_status(status: u16, url: &str) -> MediaError {
    match status {
        401 | 402 | 403 | 429 => {
            MediaError::QuotaOrAuth(format!("{} returned status code {}", url, status))
        }
        _ => MediaError::FetchFailed(format!("{} returned status code {}", url, status)),
    }
}

/// [`RemoteFetcher`] over HTTP(S).
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MediaError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<FetchedPayload> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| MediaError::InvalidReference(format!("Invalid URL format: {}", e)))?;

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::Cancelled),
            result = self.client.get(parsed).send() => result
                .map_err(|e| MediaError::FetchFailed(format!("Failed to fetch {}: {}", url, e)))?,
        };

        if !response.status().is_success() {
            return Err(classify_status(response.status().as_u16(), url));
        }

        let total = response.content_length();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut buffer = BytesMut::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MediaError::Cancelled),
                chunk = response.chunk() => chunk
                    .map_err(|e| MediaError::FetchFailed(format!("Failed reading {}: {}", url, e)))?,
            };
            let Some(chunk) = chunk else { break };
            buffer.extend_from_slice(&chunk);

            if let Some(tx) = progress {
                // Receiver going away only means nobody is watching.
                let _ = tx.send(FetchProgress {
                    received: buffer.len() as u64,
                    total,
                });
            }
        }

        tracing::info!(
            url = %url,
            size_bytes = buffer.len(),
            content_type = ?content_type,
            "Remote media fetched"
        );

        Ok(FetchedPayload {
            bytes: buffer.freeze(),
            content_type,
        })
    }
}
