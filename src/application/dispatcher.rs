use crate::domain::{ConvertRequest, ConvertResponse, Resource, ResourceId};
use crate::error::ResourceResult;
use crate::ports::blob::BlobStore;
use crate::ports::messaging::DispatchPort;
use crate::ports::registry::ResourceRegistry;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long one poll for conversion responses blocks.
const RESPONSE_POLL: Duration = Duration::from_secs(5);

/// Hands audio/video resources to the conversion workers and applies their results.
#[derive(Clone)]
pub struct ConversionDispatcher<R, B, M> {
    registry: R,
    blobs: B,
    bus: M,
}

impl<R, B, M> ConversionDispatcher<R, B, M>
where
    R: ResourceRegistry,
    B: BlobStore,
    M: DispatchPort,
{
    pub fn new(registry: R, blobs: B, bus: M) -> Self {
        Self {
            registry,
            blobs,
            bus,
        }
    }

    /// Enqueue a conversion. Returns immediately; images are skipped.
    pub async fn request_conversion(&self, resource: &Resource) -> ResourceResult<()> {
        if !resource.kind.needs_conversion() {
            return Ok(());
        }

        let request = ConvertRequest::new(resource.clone());
        info!(resource_id = %resource.id, request_id = %request.id, kind = %resource.kind, "requesting conversion");
        self.bus.send_convert(request).await?;
        Ok(())
    }

    /// Apply a worker's verdict. Returns whether the resource moved to handled.
    pub async fn complete_conversion(
        &self,
        resource_id: &ResourceId,
        success: bool,
    ) -> ResourceResult<bool> {
        if !success {
            warn!(resource_id = %resource_id, "conversion failed, resource stays unhandled");
            return Ok(false);
        }

        let resource = match self.registry.find_by_id(resource_id).await? {
            Some(resource) => resource,
            None => {
                debug!(resource_id = %resource_id, "conversion finished for a removed resource");
                return Ok(false);
            }
        };

        if resource.handled {
            return Ok(false);
        }

        if !self.blobs.exists(&resource.relative_path).await? {
            warn!(resource_id = %resource_id, path = %resource.relative_path, "artifact missing, not marking handled");
            return Ok(false);
        }

        let transitioned = self.registry.mark_handled(resource_id).await?;
        if transitioned {
            info!(resource_id = %resource_id, "resource handled");
        }
        Ok(transitioned)
    }

    pub async fn handle_response(&self, response: &ConvertResponse) -> ResourceResult<bool> {
        if let Some(message) = &response.message {
            debug!(request_id = %response.request_id, detail = %message, "conversion response");
        }
        self.complete_conversion(&response.resource_id, response.success)
            .await
    }

    /// Consume conversion responses forever.
    pub async fn run_response_listener(&self) {
        info!("conversion response listener started");
        loop {
            match self.bus.next_convert_response(RESPONSE_POLL).await {
                Ok(Some(response)) => {
                    if let Err(e) = self.handle_response(&response).await {
                        error!(resource_id = %response.resource_id, error = %e, "failed to apply conversion response");
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "conversion response channel error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
