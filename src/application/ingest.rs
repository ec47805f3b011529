use super::dispatcher::ConversionDispatcher;
use super::guard::AccessGuard;
use crate::domain::{Action, Principal, Resource, ResourceType};
use crate::error::{ResourceError, ResourceResult};
use crate::ports::blob::{BlobStore, ByteStream};
use crate::ports::identity::UserDirectory;
use crate::ports::messaging::DispatchPort;
use crate::ports::registry::ResourceRegistry;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

/// An upload as it arrives from the transport.
pub struct Upload<'a> {
    pub declared: ResourceType,
    pub file_name: String,
    pub content_type: String,
    pub body: ByteStream<'a>,
}

/// Validates uploads, registers their metadata and stores their bytes.
#[derive(Clone)]
pub struct UploadIngestor<R, B, M, U> {
    guard: AccessGuard<U>,
    registry: R,
    blobs: B,
    dispatcher: ConversionDispatcher<R, B, M>,
}

impl<R, B, M, U> UploadIngestor<R, B, M, U>
where
    R: ResourceRegistry,
    B: BlobStore,
    M: DispatchPort,
    U: UserDirectory,
{
    pub fn new(
        guard: AccessGuard<U>,
        registry: R,
        blobs: B,
        dispatcher: ConversionDispatcher<R, B, M>,
    ) -> Self {
        Self {
            guard,
            registry,
            blobs,
            dispatcher,
        }
    }

    pub async fn ingest<'a>(
        &self,
        principal: Option<&Principal>,
        upload: Upload<'a>,
    ) -> ResourceResult<Resource> {
        let user = self.guard.authorize_action(principal, Action::Add).await?;

        let Upload {
            declared,
            file_name,
            content_type,
            body,
        } = upload;

        let body = non_empty(body).await?;

        if !declared.accepts(&content_type) {
            return Err(ResourceError::ContentTypeMismatch {
                declared,
                actual: content_type,
            });
        }

        let resource = Resource::new(&user.id, declared, &content_type, &file_name);
        self.registry.insert(&resource).await?;

        info!(file = %file_name, user = %user.name, resource_id = %resource.id, "file uploading");
        match self.blobs.write(&resource.relative_path, body).await {
            Ok(bytes) => {
                info!(file = %file_name, path = %resource.relative_path, bytes, "file uploaded");
            }
            Err(e) => {
                error!(resource_id = %resource.id, error = %e, "upload failed, rolling back metadata");
                if let Err(rollback) = self.registry.delete_by_id(&resource.id).await {
                    error!(resource_id = %resource.id, error = %rollback, "metadata rollback failed");
                }
                if let Err(cleanup) = self.blobs.delete_prefix(&resource.artifact_dir()).await {
                    warn!(resource_id = %resource.id, error = %cleanup, "partial artifact cleanup failed");
                }
                return Err(e.into());
            }
        }

        // A delete may have run between the insert and the end of the write.
        if self.registry.find_by_id(&resource.id).await?.is_none() {
            warn!(resource_id = %resource.id, "resource deleted during upload, removing stored bytes");
            self.blobs.delete_prefix(&resource.artifact_dir()).await?;
            return Err(ResourceError::Conflict(resource.id));
        }

        if let Err(e) = self.dispatcher.request_conversion(&resource).await {
            warn!(resource_id = %resource.id, error = %e, "conversion request not delivered, resource stays unhandled");
        }

        Ok(resource)
    }
}

/// Read up to the first non-empty chunk, then hand back the whole stream.
async fn non_empty(mut body: ByteStream<'_>) -> ResourceResult<ByteStream<'_>> {
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ResourceError::InvalidUpload(e.to_string()))?;
        if !chunk.is_empty() {
            let head = stream::once(async move { Ok::<_, std::io::Error>(chunk) });
            return Ok(head.chain(body).boxed());
        }
    }
    Err(ResourceError::EmptyFile)
}
