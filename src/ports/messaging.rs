use crate::domain::{
    ConvertRequest, ConvertResponse, DeleteRequest, DeleteResponse, ResourceType, WorkerRequest,
};
use crate::error::MessagingError;
use async_trait::async_trait;
use std::time::Duration;

/// Service side of the worker channel.
#[async_trait]
pub trait DispatchPort: Send + Sync {
    /// Publish a convert request on its type's queue without waiting for the result
    async fn send_convert(&self, request: ConvertRequest) -> Result<(), MessagingError>;

    /// Publish a delete request and wait for the worker's reply
    async fn request_delete(
        &self,
        request: DeleteRequest,
        timeout: Duration,
    ) -> Result<DeleteResponse, MessagingError>;

    /// Next conversion result, or None when `timeout` elapses first
    async fn next_convert_response(
        &self,
        timeout: Duration,
    ) -> Result<Option<ConvertResponse>, MessagingError>;
}

/// Worker side of the worker channel.
#[async_trait]
pub trait WorkerPort: Send + Sync {
    /// Dequeue a request for `kind`, or None when `timeout` elapses first
    async fn next_request(
        &self,
        kind: ResourceType,
        timeout: Duration,
    ) -> Result<Option<WorkerRequest>, MessagingError>;

    async fn reply_convert(&self, response: ConvertResponse) -> Result<(), MessagingError>;

    async fn reply_delete(&self, response: DeleteResponse) -> Result<(), MessagingError>;
}
