use crate::domain::ResourceType;
use crate::error::TranscodeError;
use crate::ports::transcoder::Transcoder;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as TokioCommand;
use tracing::debug;

/// Name of the DASH manifest written next to the segments.
pub const MANIFEST_NAME: &str = "manifest.mpd";

/// Segment length in seconds.
const SEGMENT_SECONDS: &str = "4";

/// Runs the `ffmpeg` executable to produce MPEG-DASH output.
#[derive(Clone, Debug)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for one conversion.
    pub fn args(&self, kind: ResourceType, source: &Path, output_dir: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.display().to_string(),
        ];

        match kind {
            ResourceType::Video => args.extend(
                [
                    "-map", "0:v:0", "-map", "0:a:0?", "-c:v", "libx264", "-preset", "veryfast",
                    "-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", "128k",
                ]
                .map(String::from),
            ),
            ResourceType::Audio => args.extend(
                ["-vn", "-map", "0:a:0", "-c:a", "aac", "-b:a", "128k"].map(String::from),
            ),
            ResourceType::Image => {}
        }

        args.extend(
            [
                "-f",
                "dash",
                "-seg_duration",
                SEGMENT_SECONDS,
                "-use_template",
                "1",
                "-use_timeline",
                "1",
                "-init_seg_name",
                "init-$RepresentationID$.m4s",
                "-media_seg_name",
                "chunk-$RepresentationID$-$Number%05d$.m4s",
            ]
            .map(String::from),
        );
        args.push(output_dir.join(MANIFEST_NAME).display().to_string());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        kind: ResourceType,
        source: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscodeError> {
        let program = self.program.display().to_string();
        if !kind.needs_conversion() {
            return Ok(());
        }

        let args = self.args(kind, source, output_dir);
        debug!(program = %program, ?args, "running transcoder");
        let output = TokioCommand::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
