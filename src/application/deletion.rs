use super::guard::{authorize_resource, AccessGuard};
use crate::domain::{Action, DeleteRequest, Principal, Resource, ResourceId};
use crate::error::{MessagingError, ResourceError, ResourceResult};
use crate::ports::blob::BlobStore;
use crate::ports::identity::UserDirectory;
use crate::ports::messaging::DispatchPort;
use crate::ports::registry::ResourceRegistry;
use std::time::Duration;
use tracing::{error, info, warn};

/// Removes a resource's artifacts through the workers, then its metadata.
#[derive(Clone)]
pub struct DeletionCoordinator<R, B, M, U> {
    guard: AccessGuard<U>,
    registry: R,
    blobs: B,
    bus: M,
    reply_timeout: Duration,
}

impl<R, B, M, U> DeletionCoordinator<R, B, M, U>
where
    R: ResourceRegistry,
    B: BlobStore,
    M: DispatchPort,
    U: UserDirectory,
{
    pub fn new(guard: AccessGuard<U>, registry: R, blobs: B, bus: M, reply_timeout: Duration) -> Self {
        Self {
            guard,
            registry,
            blobs,
            bus,
            reply_timeout,
        }
    }

    pub async fn delete(
        &self,
        principal: Option<&Principal>,
        resource_id: &ResourceId,
    ) -> ResourceResult<Resource> {
        let user = self
            .guard
            .authorize_action(principal, Action::Delete)
            .await?;

        let resource = self
            .registry
            .find_by_id(resource_id)
            .await?
            .ok_or(ResourceError::NotFound(*resource_id))?;
        authorize_resource(&user, &resource, Action::Delete)?;

        info!(resource_id = %resource.id, path = %resource.relative_path, "file deleting");
        if self.blobs.exists(&resource.relative_path).await? {
            self.cleanup_artifacts(&resource).await?;
        } else {
            info!(resource_id = %resource.id, "no artifact on disk, skipping worker cleanup");
        }
        info!(resource_id = %resource.id, path = %resource.relative_path, "file deleted");

        if !self.registry.delete_by_id(&resource.id).await? {
            warn!(resource_id = %resource.id, "record already removed");
        }

        Ok(resource)
    }

    async fn cleanup_artifacts(&self, resource: &Resource) -> ResourceResult<()> {
        let request = DeleteRequest::new(resource.clone(), self.reply_timeout);
        let request_id = request.id.clone();

        match self.bus.request_delete(request, self.reply_timeout).await {
            Ok(response) if response.success => Ok(()),
            Ok(response) => {
                error!(
                    resource_id = %resource.id,
                    request_id = %request_id,
                    reason = response.message.as_deref().unwrap_or(""),
                    "worker reported delete failure"
                );
                Err(ResourceError::DeleteFailed(resource.id))
            }
            Err(MessagingError::Timeout(_)) => {
                error!(resource_id = %resource.id, request_id = %request_id, "delete request timed out");
                Err(ResourceError::DeleteFailed(resource.id))
            }
            Err(e) => Err(e.into()),
        }
    }
}
