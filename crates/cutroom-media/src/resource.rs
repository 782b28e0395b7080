use crate::blob::BlobHandle;

/// A playable resource produced by the resolver.
///
/// Pass-through resources point at something the player can load directly.
/// Blob resources are owned allocations that the holder must release when the
/// mount ends; dropping the value releases them as well.
#[derive(Debug)]
pub enum ResolvedResource {
    PassThrough { url: String, mime: Option<String> },
    Blob(BlobHandle),
}

impl ResolvedResource {
    pub fn url(&self) -> &str {
        match self {
            ResolvedResource::PassThrough { url, .. } => url,
            ResolvedResource::Blob(handle) => handle.url(),
        }
    }

    /// Effective type a player should decode with, when known.
    pub fn mime(&self) -> Option<&str> {
        match self {
            ResolvedResource::PassThrough { mime, .. } => mime.as_deref(),
            ResolvedResource::Blob(handle) => Some(handle.mime()),
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, ResolvedResource::Blob(_))
    }

    pub fn release(&mut self) {
        if let ResolvedResource::Blob(handle) = self {
            handle.release();
        }
    }
}
