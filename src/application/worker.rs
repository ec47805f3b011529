use crate::domain::{
    ConvertRequest, ConvertResponse, DeleteRequest, DeleteResponse, ResourceType, WorkerRequest,
};
use crate::ports::blob::BlobStore;
use crate::ports::messaging::WorkerPort;
use crate::ports::transcoder::Transcoder;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{error, info, warn};

/// How long one dequeue blocks before the loop polls again.
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer side of the conversion queues.
pub struct WorkerService<Q, S, T> {
    queue: Q,
    storage: S,
    transcoder: T,
}

impl<Q, S, T> WorkerService<Q, S, T>
where
    Q: WorkerPort,
    S: BlobStore,
    T: Transcoder,
{
    pub fn new(queue: Q, storage: S, transcoder: T) -> Self {
        Self {
            queue,
            storage,
            transcoder,
        }
    }

    pub async fn run_worker_loop(&self, worker_id: usize, kind: ResourceType) {
        info!(worker_id, %kind, "worker started");
        loop {
            match self.queue.next_request(kind, DEQUEUE_TIMEOUT).await {
                Ok(Some(request)) => {
                    if let Err(e) = self.process_request(request, worker_id).await {
                        error!(worker_id, %kind, error = %e, "failed to reply");
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_id, %kind, error = %e, "queue error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Handle one request and send its response.
    pub async fn process_request(
        &self,
        request: WorkerRequest,
        worker_id: usize,
    ) -> Result<(), crate::error::MessagingError> {
        match request {
            WorkerRequest::Convert(req) => {
                let response = self.process_convert(&req, worker_id).await;
                self.queue.reply_convert(response).await
            }
            WorkerRequest::Delete(req) => {
                let response = self.process_delete(&req, worker_id).await;
                self.queue.reply_delete(response).await
            }
        }
    }

    async fn process_convert(&self, request: &ConvertRequest, worker_id: usize) -> ConvertResponse {
        let resource = &request.resource;
        if !resource.kind.needs_conversion() {
            return ConvertResponse::ok(request);
        }

        info!(worker_id, resource_id = %resource.id, kind = %resource.kind, "converting");
        match self.convert(request).await {
            Ok(outputs) => {
                info!(worker_id, resource_id = %resource.id, outputs, "conversion finished");
                ConvertResponse::ok(request)
            }
            Err(e) => {
                warn!(worker_id, resource_id = %resource.id, error = %e, "conversion failed");
                ConvertResponse::failed(request, e.to_string())
            }
        }
    }

    /// Download, transcode, upload. Returns the number of uploaded files.
    async fn convert(
        &self,
        request: &ConvertRequest,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let resource = &request.resource;
        let workdir = TempDir::new()?;

        let file_name = Path::new(&resource.relative_path)
            .file_name()
            .ok_or("Invalid source path")?;
        let source = workdir.path().join(file_name);
        self.storage.download(&resource.relative_path, &source).await?;

        let output_dir = workdir.path().join("stream");
        tokio::fs::create_dir_all(&output_dir).await?;
        self.transcoder
            .transcode(resource.kind, &source, &output_dir)
            .await?;

        let stream_dir = resource.stream_dir();
        let mut uploaded = 0;
        let mut entries = tokio::fs::read_dir(&output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_str().ok_or("Non UTF-8 output name")?;
            let key = format!("{}/{}", stream_dir, name);
            self.storage.upload(&entry.path(), &key).await?;
            uploaded += 1;
        }

        if uploaded == 0 {
            return Err("Transcoding failed to produce output".into());
        }
        Ok(uploaded)
    }

    async fn process_delete(&self, request: &DeleteRequest, worker_id: usize) -> DeleteResponse {
        let resource = &request.resource;
        if request.is_expired() {
            warn!(worker_id, resource_id = %resource.id, request_id = %request.id, "delete request expired, artifacts kept");
            return DeleteResponse::failed(request, "delete request expired");
        }
        info!(worker_id, resource_id = %resource.id, dir = %resource.artifact_dir(), "deleting artifacts");
        match self.storage.delete_prefix(&resource.artifact_dir()).await {
            Ok(()) => DeleteResponse::ok(request),
            Err(e) => {
                warn!(worker_id, resource_id = %resource.id, error = %e, "artifact delete failed");
                DeleteResponse::failed(request, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::fs::FsBlobStore;
    use crate::adapters::local::memory::InMemoryBus;
    use crate::domain::Resource;
    use crate::error::TranscodeError;
    use crate::ports::messaging::DispatchPort;
    use crate::ports::transcoder::MockTranscoder;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use tempfile::tempdir;

    async fn stored_video(blobs: &FsBlobStore) -> Resource {
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "clip.mp4");
        let body = stream::iter(vec![Ok(Bytes::from_static(b"0123456789"))]).boxed();
        blobs.write(&resource.relative_path, body).await.unwrap();
        resource
    }

    #[tokio::test]
    async fn test_convert_uploads_outputs_and_replies_success() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let bus = InMemoryBus::new();
        let resource = stored_video(&blobs).await;

        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_transcode()
            .withf(|kind, source, _| {
                *kind == ResourceType::Video && std::fs::read(source).unwrap() == b"0123456789"
            })
            .times(1)
            .returning(|_, _, output_dir| {
                std::fs::write(output_dir.join("manifest.mpd"), b"<MPD/>").unwrap();
                std::fs::write(output_dir.join("chunk-0.m4s"), b"data").unwrap();
                Ok(())
            });

        let worker = WorkerService::new(bus.clone(), blobs.clone(), transcoder);
        let request = ConvertRequest::new(resource.clone());
        worker
            .process_request(WorkerRequest::Convert(request), 0)
            .await
            .unwrap();

        let response = bus
            .next_convert_response(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert!(response.success);
        assert_eq!(response.resource_id, resource.id);
        assert!(blobs
            .exists(&format!("{}/manifest.mpd", resource.stream_dir()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_transcoder_failure_replies_failure() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let bus = InMemoryBus::new();
        let resource = stored_video(&blobs).await;

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().returning(|_, _, _| {
            Err(TranscodeError::Failed {
                program: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            })
        });

        let worker = WorkerService::new(bus.clone(), blobs, transcoder);
        worker
            .process_request(WorkerRequest::Convert(ConvertRequest::new(resource)), 0)
            .await
            .unwrap();

        let response = bus
            .next_convert_response(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert!(!response.success);
        assert!(response.message.unwrap().contains("Invalid data"));
    }

    #[tokio::test]
    async fn test_missing_source_replies_failure() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let bus = InMemoryBus::new();
        let resource = Resource::new("u1", ResourceType::Audio, "audio/mpeg", "a.mp3");

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(0);

        let worker = WorkerService::new(bus.clone(), blobs, transcoder);
        worker
            .process_request(WorkerRequest::Convert(ConvertRequest::new(resource)), 0)
            .await
            .unwrap();

        let response = bus
            .next_convert_response(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_delete_removes_artifact_dir() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let bus = InMemoryBus::new();
        let resource = stored_video(&blobs).await;

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(0);
        let worker = WorkerService::new(bus.clone(), blobs.clone(), transcoder);

        let delete = {
            let bus = bus.clone();
            let resource = resource.clone();
            tokio::spawn(async move {
                bus.request_delete(DeleteRequest::new(resource, Duration::from_secs(2)), Duration::from_secs(2))
                    .await
            })
        };

        let request = bus
            .next_request(ResourceType::Video, Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();
        worker.process_request(request, 1).await.unwrap();

        let response = delete.await.unwrap().unwrap();
        assert!(response.success);
        assert!(!blobs.exists(&resource.relative_path).await.unwrap());
        assert!(!dir.path().join(resource.artifact_dir()).exists());
    }

    #[tokio::test]
    async fn test_expired_delete_keeps_artifact() {
        let dir = tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        let bus = InMemoryBus::new();
        let resource = stored_video(&blobs).await;

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(0);
        let worker = WorkerService::new(bus, blobs.clone(), transcoder);

        let request = DeleteRequest::new(resource.clone(), Duration::ZERO);
        let response = worker.process_delete(&request, 1).await;
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("delete request expired"));
        assert!(blobs.exists(&resource.relative_path).await.unwrap());
    }
}
