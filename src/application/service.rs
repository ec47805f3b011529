use super::catalog::ResourceCatalog;
use super::deletion::DeletionCoordinator;
use super::dispatcher::ConversionDispatcher;
use super::guard::AccessGuard;
use super::ingest::{Upload, UploadIngestor};
use crate::domain::{Page, PageRequest, Principal, Resource, ResourceId, ResourceType};
use crate::error::ResourceResult;
use crate::ports::blob::BlobStore;
use crate::ports::identity::UserDirectory;
use crate::ports::messaging::DispatchPort;
use crate::ports::registry::ResourceRegistry;
use std::time::Duration;

/// Everything the HTTP surface needs, wired from one set of ports.
#[derive(Clone)]
pub struct StaticResourceService<R, B, M, U> {
    catalog: ResourceCatalog<R, U>,
    ingestor: UploadIngestor<R, B, M, U>,
    deletion: DeletionCoordinator<R, B, M, U>,
    dispatcher: ConversionDispatcher<R, B, M>,
}

impl<R, B, M, U> StaticResourceService<R, B, M, U>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    pub fn new(registry: R, blobs: B, bus: M, directory: U, delete_timeout: Duration) -> Self {
        let guard = AccessGuard::new(directory);
        let dispatcher = ConversionDispatcher::new(registry.clone(), blobs.clone(), bus.clone());
        Self {
            catalog: ResourceCatalog::new(guard.clone(), registry.clone()),
            ingestor: UploadIngestor::new(
                guard.clone(),
                registry.clone(),
                blobs.clone(),
                dispatcher.clone(),
            ),
            deletion: DeletionCoordinator::new(guard, registry, blobs, bus, delete_timeout),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &ConversionDispatcher<R, B, M> {
        &self.dispatcher
    }

    pub async fn list(
        &self,
        principal: Option<&Principal>,
        kind: ResourceType,
        page: PageRequest,
    ) -> ResourceResult<Page<Resource>> {
        self.catalog.list(principal, kind, page).await
    }

    pub async fn load(&self, principal: Option<&Principal>, id: &ResourceId) -> ResourceResult<Resource> {
        self.catalog.load(principal, id).await
    }

    pub async fn add<'a>(&self, principal: Option<&Principal>, upload: Upload<'a>) -> ResourceResult<Resource> {
        self.ingestor.ingest(principal, upload).await
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: &ResourceId) -> ResourceResult<Resource> {
        self.deletion.delete(principal, id).await
    }

    pub async fn toggle_public(
        &self,
        principal: Option<&Principal>,
        id: &ResourceId,
    ) -> ResourceResult<Resource> {
        self.catalog.toggle_public(principal, id).await
    }
}
