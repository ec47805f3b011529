//! Domain layer - Pure business logic.

pub mod access;
pub mod messages;
pub mod page;
pub mod resource;

pub use access::{Action, Grant, Principal, User};
pub use messages::{ConvertRequest, ConvertResponse, DeleteRequest, DeleteResponse, WorkerRequest};
pub use page::{Page, PageRequest};
pub use resource::{Resource, ResourceId, ResourceType};
