//! Local adapters for monolith deployment.

pub mod directory;
pub mod ffmpeg;
pub mod fs;
pub mod http;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use directory::JsonUserDirectory;
pub use ffmpeg::FfmpegTranscoder;
pub use fs::FsBlobStore;
pub use memory::{InMemoryBus, InMemoryRegistry};
#[cfg(feature = "redis")]
pub use redis::RedisPool;
