//! Application layer - Generic services that use ports.

pub mod catalog;
pub mod deletion;
pub mod dispatcher;
pub mod guard;
pub mod ingest;
pub mod service;
pub mod worker;

pub use catalog::ResourceCatalog;
pub use deletion::DeletionCoordinator;
pub use dispatcher::ConversionDispatcher;
pub use guard::AccessGuard;
pub use ingest::{Upload, UploadIngestor};
pub use service::StaticResourceService;
pub use worker::WorkerService;
