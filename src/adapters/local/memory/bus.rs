//! In-process worker channel built on tokio channels.

use crate::domain::{
    ConvertRequest, ConvertResponse, DeleteRequest, DeleteResponse, ResourceType, WorkerRequest,
};
use crate::error::MessagingError;
use crate::ports::messaging::{DispatchPort, WorkerPort};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;
use tracing::debug;

struct Lane<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T> Lane<T> {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    fn send(&self, item: T, name: &str) -> Result<(), MessagingError> {
        self.tx
            .send(item)
            .map_err(|_| MessagingError::Closed(name.to_string()))
    }

    async fn recv(&self, timeout: Duration, name: &str) -> Result<Option<T>, MessagingError> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => Err(MessagingError::Closed(name.to_string())),
            Err(_) => Ok(None),
        }
    }
}

struct Inner {
    requests: HashMap<ResourceType, Lane<WorkerRequest>>,
    convert_responses: Lane<ConvertResponse>,
    pending_deletes: StdMutex<HashMap<String, oneshot::Sender<DeleteResponse>>>,
}

/// One queue per resource type plus a shared convert-response queue. Delete
/// replies are routed straight back to the waiting caller by request id.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: Arc<Inner>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        let requests = ResourceType::ALL
            .iter()
            .map(|kind| (*kind, Lane::new()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                requests,
                convert_responses: Lane::new(),
                pending_deletes: StdMutex::new(HashMap::new()),
            }),
        }
    }

    fn lane(&self, kind: ResourceType) -> Result<&Lane<WorkerRequest>, MessagingError> {
        self.inner
            .requests
            .get(&kind)
            .ok_or_else(|| MessagingError::Closed(format!("requests:{}", kind)))
    }

    fn pending(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<DeleteResponse>>>, MessagingError>
    {
        self.inner
            .pending_deletes
            .lock()
            .map_err(|_| MessagingError::Backend("pending delete table poisoned".to_string()))
    }
}

#[async_trait]
impl DispatchPort for InMemoryBus {
    async fn send_convert(&self, request: ConvertRequest) -> Result<(), MessagingError> {
        let kind = request.resource.kind;
        self.lane(kind)?
            .send(WorkerRequest::Convert(request), kind.as_str())
    }

    async fn request_delete(
        &self,
        request: DeleteRequest,
        timeout: Duration,
    ) -> Result<DeleteResponse, MessagingError> {
        let request_id = request.id.clone();
        let kind = request.resource.kind;
        let (tx, rx) = oneshot::channel();
        self.pending()?.insert(request_id.clone(), tx);

        if let Err(e) = self.lane(kind)?.send(WorkerRequest::Delete(request), kind.as_str()) {
            self.pending()?.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(MessagingError::Closed(format!("delete reply {}", request_id))),
            Err(_) => {
                self.pending()?.remove(&request_id);
                Err(MessagingError::Timeout(request_id))
            }
        }
    }

    async fn next_convert_response(
        &self,
        timeout: Duration,
    ) -> Result<Option<ConvertResponse>, MessagingError> {
        self.inner
            .convert_responses
            .recv(timeout, "responses:convert")
            .await
    }
}

#[async_trait]
impl WorkerPort for InMemoryBus {
    async fn next_request(
        &self,
        kind: ResourceType,
        timeout: Duration,
    ) -> Result<Option<WorkerRequest>, MessagingError> {
        let lane = self.lane(kind)?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(request) = lane.recv(remaining, kind.as_str()).await? else {
                return Ok(None);
            };
            // Nobody waits for a delete whose caller already timed out.
            if let WorkerRequest::Delete(delete) = &request {
                if !self.pending()?.contains_key(&delete.id) {
                    debug!(request_id = %delete.id, "abandoned delete request dropped");
                    continue;
                }
            }
            return Ok(Some(request));
        }
    }

    async fn reply_convert(&self, response: ConvertResponse) -> Result<(), MessagingError> {
        self.inner
            .convert_responses
            .send(response, "responses:convert")
    }

    async fn reply_delete(&self, response: DeleteResponse) -> Result<(), MessagingError> {
        let waiter = self.pending()?.remove(&response.request_id);
        match waiter {
            Some(tx) => {
                // The caller may have given up between the lookup and the send.
                let _ = tx.send(response);
            }
            None => debug!(request_id = %response.request_id, "late delete reply dropped"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Resource;

    #[tokio::test]
    async fn test_requests_are_routed_by_type() {
        let bus = InMemoryBus::new();
        let audio = Resource::new("u1", ResourceType::Audio, "audio/mpeg", "a.mp3");
        bus.send_convert(ConvertRequest::new(audio.clone())).await.unwrap();

        let none = bus
            .next_request(ResourceType::Video, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(none.is_none());

        let request = bus
            .next_request(ResourceType::Audio, Duration::from_millis(20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.resource().id, audio.id);
    }

    #[tokio::test]
    async fn test_delete_without_worker_times_out() {
        let bus = InMemoryBus::new();
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        let result = bus
            .request_delete(DeleteRequest::new(resource, Duration::from_millis(20)), Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(MessagingError::Timeout(_))));
        assert!(bus.pending().unwrap().is_empty());

        let abandoned = bus
            .next_request(ResourceType::Video, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(abandoned.is_none());
    }

    #[tokio::test]
    async fn test_delete_reply_reaches_caller() {
        let bus = InMemoryBus::new();
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");

        let worker = {
            let bus = bus.clone();
            tokio::spawn(async move {
                let request = bus
                    .next_request(ResourceType::Video, Duration::from_secs(1))
                    .await
                    .unwrap()
                    .unwrap();
                match request {
                    WorkerRequest::Delete(req) => {
                        bus.reply_delete(DeleteResponse::failed(&req, "disk busy")).await.unwrap()
                    }
                    other => panic!("unexpected request {:?}", other),
                }
            })
        };

        let response = bus
            .request_delete(DeleteRequest::new(resource, Duration::from_secs(1)), Duration::from_secs(1))
            .await
            .unwrap();
        worker.await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("disk busy"));
    }
}
