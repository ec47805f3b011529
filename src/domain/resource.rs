use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

pub type ResourceId = Uuid;

/// Media family of a static resource. Immutable once the resource exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Audio,
    Video,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Image, ResourceType::Audio, ResourceType::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Audio => "audio",
            ResourceType::Video => "video",
        }
    }

    /// Content-type prefix an upload of this type must carry.
    pub fn content_type_prefix(&self) -> &'static str {
        match self {
            ResourceType::Image => "image/",
            ResourceType::Audio => "audio/",
            ResourceType::Video => "video/",
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with(self.content_type_prefix())
    }

    /// Audio and video go through the conversion workers, images do not.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, ResourceType::Image)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResourceType(pub String);

impl fmt::Display for UnknownResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource type '{}'", self.0)
    }
}

impl std::error::Error for UnknownResourceType {}

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ResourceType::Image),
            "audio" => Ok(ResourceType::Audio),
            "video" => Ok(ResourceType::Video),
            _ => Err(UnknownResourceType(s.to_string())),
        }
    }
}

/// A registered media asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub content_type: String,
    pub origin_name: String,
    /// Blob key of the uploaded artifact, relative to the storage root.
    pub relative_path: String,
    pub public: bool,
    /// False while audio/video conversion is still in progress.
    pub handled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by every registry write; updates compare against it.
    pub version: u64,
}

impl Resource {
    pub fn new(
        owner_id: &str,
        kind: ResourceType,
        content_type: &str,
        origin_name: &str,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.to_string(),
            kind,
            content_type: content_type.to_string(),
            origin_name: origin_name.to_string(),
            relative_path: storage_path(owner_id, kind, &id, origin_name),
            public: false,
            handled: !kind.needs_conversion(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Directory holding the artifact and everything derived from it.
    pub fn artifact_dir(&self) -> String {
        format!("{}/{}/{}", self.owner_id, self.kind, self.id)
    }

    /// Directory the conversion output is uploaded to.
    pub fn stream_dir(&self) -> String {
        format!("{}/stream", self.artifact_dir())
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// `{owner}/{type}/{id}/{id}{.ext}`, keeping the extension of the original filename.
pub fn storage_path(owner_id: &str, kind: ResourceType, id: &ResourceId, origin_name: &str) -> String {
    let extension = Path::new(origin_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}/{}/{}/{}{}", owner_id, kind, id, id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_prefix_matching() {
        assert!(ResourceType::Video.accepts("video/mp4"));
        assert!(ResourceType::Video.accepts("Video/MP4"));
        assert!(ResourceType::Audio.accepts("audio/mpeg"));
        assert!(ResourceType::Image.accepts("image/png"));
        assert!(!ResourceType::Image.accepts("application/pdf"));
        assert!(!ResourceType::Image.accepts("imagex/png"));
        assert!(!ResourceType::Audio.accepts("video/mp4"));
        assert!(!ResourceType::Video.accepts(""));
    }

    #[test]
    fn test_storage_path_keeps_extension() {
        let id = Uuid::new_v4();
        let path = storage_path("42", ResourceType::Video, &id, "holiday.clip.mp4");
        assert_eq!(path, format!("42/video/{}/{}.mp4", id, id));
    }

    #[test]
    fn test_storage_path_without_extension() {
        let id = Uuid::new_v4();
        let path = storage_path("42", ResourceType::Audio, &id, "README");
        assert_eq!(path, format!("42/audio/{}/{}", id, id));
    }

    #[test]
    fn test_storage_path_drops_suspicious_extension() {
        let id = Uuid::new_v4();
        let path = storage_path("42", ResourceType::Image, &id, "a.p/../ng");
        assert!(!path.contains(".."));
    }

    #[test]
    fn test_new_resource_handled_only_for_images() {
        let image = Resource::new("u1", ResourceType::Image, "image/png", "a.png");
        let audio = Resource::new("u1", ResourceType::Audio, "audio/mpeg", "a.mp3");
        let video = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        assert!(image.handled);
        assert!(!audio.handled);
        assert!(!video.handled);
        assert!(!video.public);
        assert_eq!(video.stream_dir(), format!("u1/video/{}/stream", video.id));
    }

    #[test]
    fn test_resource_type_from_str() {
        assert_eq!("VIDEO".parse::<ResourceType>(), Ok(ResourceType::Video));
        assert!("document".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_resource_serializes_kind_as_type() {
        let resource = Resource::new("u1", ResourceType::Audio, "audio/ogg", "a.ogg");
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["handled"], false);
    }
}
