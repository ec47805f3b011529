use crate::domain::ResourceType;
use crate::error::TranscodeError;
use async_trait::async_trait;
use std::path::Path;

/// Opaque conversion engine turning an uploaded file into streaming output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `source` and write every produced file into `output_dir`
    async fn transcode(
        &self,
        kind: ResourceType,
        source: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscodeError>;
}
