//! Test helpers: an in-memory studio (store, project, resolver) plus fixtures.
//!
//! Run from workspace root: `cargo test -p cutroom-media`.

#![allow(dead_code)]

pub mod fetcher;
pub mod fixtures;

use cutroom_core::models::{Cut, ProjectId};
use cutroom_core::InMemoryProject;
use cutroom_media::{BlobRegistry, ReferenceResolver, RemoteFetcher};
use cutroom_storage::{ContentStore, MemoryStore};
use std::sync::Arc;

pub use fetcher::ScriptedFetcher;

/// Everything a media test needs, wired to in-memory fakes.
pub struct TestStudio {
    pub store: Arc<dyn ContentStore>,
    pub project: Arc<InMemoryProject>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub blobs: Arc<BlobRegistry>,
    pub resolver: Arc<ReferenceResolver>,
}

impl TestStudio {
    pub fn project_id(&self) -> ProjectId {
        use cutroom_core::ProjectContext;
        self.project.project_id()
    }
}

pub fn setup_studio(cuts: Vec<Cut>) -> TestStudio {
    setup_studio_with_store(Arc::new(MemoryStore::new()), cuts)
}

pub fn setup_studio_with_store(store: Arc<dyn ContentStore>, cuts: Vec<Cut>) -> TestStudio {
    setup_studio_in(ProjectId::new(), store, cuts)
}

/// Studio for a known project id, so tests can derive its keys up front.
pub fn setup_studio_in(
    project_id: ProjectId,
    store: Arc<dyn ContentStore>,
    cuts: Vec<Cut>,
) -> TestStudio {
    let project = Arc::new(InMemoryProject::new(project_id, cuts));
    let fetcher = Arc::new(ScriptedFetcher::default());
    let blobs = BlobRegistry::new();
    let resolver = Arc::new(
        ReferenceResolver::new(
            store.clone(),
            fetcher.clone() as Arc<dyn RemoteFetcher>,
            project_id,
        )
        .with_blob_registry(blobs.clone()),
    );

    TestStudio {
        store,
        project,
        fetcher,
        blobs,
        resolver,
    }
}
