//! Request/response envelopes exchanged with the conversion workers.

use super::resource::{Resource, ResourceId, ResourceType};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub id: String,
    pub resource: Resource,
}

impl ConvertRequest {
    pub fn new(resource: Resource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: String,
    pub resource: Resource,
    /// The caller stops waiting at this instant. Workers must not act on the
    /// request afterwards, since the caller has already reported failure.
    pub expires_at: DateTime<Utc>,
}

impl DeleteRequest {
    /// A request the caller will wait `ttl` for.
    pub fn new(resource: Resource, ttl: Duration) -> Self {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4().to_string(),
            resource,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerRequest {
    Convert(ConvertRequest),
    Delete(DeleteRequest),
}

impl WorkerRequest {
    pub fn id(&self) -> &str {
        match self {
            WorkerRequest::Convert(req) => &req.id,
            WorkerRequest::Delete(req) => &req.id,
        }
    }

    pub fn resource(&self) -> &Resource {
        match self {
            WorkerRequest::Convert(req) => &req.resource,
            WorkerRequest::Delete(req) => &req.resource,
        }
    }

    /// Queue the request is routed to.
    pub fn kind(&self) -> ResourceType {
        self.resource().kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub request_id: String,
    pub resource_id: ResourceId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConvertResponse {
    pub fn ok(request: &ConvertRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            resource_id: request.resource.id,
            success: true,
            message: None,
        }
    }

    pub fn failed(request: &ConvertRequest, message: impl Into<String>) -> Self {
        Self {
            request_id: request.id.clone(),
            resource_id: request.resource.id,
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub request_id: String,
    pub resource_id: ResourceId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeleteResponse {
    pub fn ok(request: &DeleteRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            resource_id: request.resource.id,
            success: true,
            message: None,
        }
    }

    pub fn failed(request: &DeleteRequest, message: impl Into<String>) -> Self {
        Self {
            request_id: request.id.clone(),
            resource_id: request.resource.id,
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_request_is_tagged() {
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        let request = WorkerRequest::Convert(ConvertRequest::new(resource));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "Convert");
        assert_eq!(json["resource"]["type"], "video");

        let back: WorkerRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.kind(), ResourceType::Video);
    }

    #[test]
    fn test_failed_response_carries_message() {
        let resource = Resource::new("u1", ResourceType::Audio, "audio/mpeg", "a.mp3");
        let request = DeleteRequest::new(resource.clone(), Duration::from_secs(30));
        let response = DeleteResponse::failed(&request, "disk gone");
        assert!(!response.success);
        assert_eq!(response.resource_id, resource.id);
        assert_eq!(response.request_id, request.id);
        assert_eq!(response.message.as_deref(), Some("disk gone"));
    }

    #[test]
    fn test_delete_request_deadline() {
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        let request = DeleteRequest::new(resource, Duration::from_secs(30));
        assert!(!request.is_expired());
        assert!(request.is_expired_at(request.expires_at));
        assert!(request.is_expired_at(Utc::now() + TimeDelta::seconds(31)));

        let json = serde_json::to_value(WorkerRequest::Delete(request.clone())).unwrap();
        let back: WorkerRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, WorkerRequest::Delete(request));
    }
}
