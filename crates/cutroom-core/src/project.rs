//! Project context
//!
//! Components receive the project explicitly instead of reaching into a global
//! store: they read the cut list and write back merged partial updates by id.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{MediaError, MediaResult};
use crate::models::{Cut, CutId, CutPatch, ProjectId};

#[async_trait]
pub trait ProjectContext: Send + Sync {
    fn project_id(&self) -> ProjectId;

    /// Snapshot of every cut in script order.
    async fn cuts(&self) -> Vec<Cut>;

    async fn cut(&self, id: CutId) -> Option<Cut> {
        self.cuts().await.into_iter().find(|cut| cut.id == id)
    }

    /// Merge `patch` into the cut with the given id and return the result.
    async fn update_cut(&self, id: CutId, patch: CutPatch) -> MediaResult<Cut>;
}

/// Project held in process memory.
pub struct InMemoryProject {
    id: ProjectId,
    cuts: RwLock<Vec<Cut>>,
}

impl InMemoryProject {
    pub fn new(id: ProjectId, cuts: Vec<Cut>) -> Self {
        Self {
            id,
            cuts: RwLock::new(cuts),
        }
    }
}

#[async_trait]
impl ProjectContext for InMemoryProject {
    fn project_id(&self) -> ProjectId {
        self.id
    }

    async fn cuts(&self) -> Vec<Cut> {
        self.cuts.read().await.clone()
    }

    async fn update_cut(&self, id: CutId, patch: CutPatch) -> MediaResult<Cut> {
        let mut cuts = self.cuts.write().await;
        let cut = cuts
            .iter_mut()
            .find(|cut| cut.id == id)
            .ok_or_else(|| MediaError::NotFound(format!("Cut {} not found", id)))?;

        // Apply to a copy so a rejected patch leaves the record untouched.
        let mut updated = cut.clone();
        updated.apply(&patch)?;
        *cut = updated.clone();

        tracing::debug!(cut_id = id, "Cut updated");
        Ok(updated)
    }
}
