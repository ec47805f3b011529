//! Static Resource - media upload, catalog and conversion service
//!
//! Hexagonal Architecture:
//! - domain/: Pure types (resources, paging, access rules, worker messages)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (filesystem, memory, Redis, ffmpeg, HTTP)
//! - application/: Generic services
//! - config: Environment configuration
//!
//! # Features
//! - `redis`: Redis-backed registry and worker queues, and the standalone worker binary

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::StaticResourceService;
pub use config::{LocalConfig, WorkerConfig};
pub use error::{ResourceError, ResourceResult};
