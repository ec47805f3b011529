//! Ports - Trait definitions for the collaborators the services depend on.

pub mod blob;
pub mod identity;
pub mod messaging;
pub mod registry;
pub mod transcoder;

pub use blob::{BlobStore, ByteStream};
pub use identity::UserDirectory;
pub use messaging::{DispatchPort, WorkerPort};
pub use registry::{ResourceRegistry, UpdateOutcome};
pub use transcoder::Transcoder;
