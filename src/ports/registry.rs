use crate::domain::{Page, PageRequest, Resource, ResourceId, ResourceType};
use crate::error::RegistryError;
use async_trait::async_trait;

/// Outcome of a compare-and-set write.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The write landed; carries the stored record.
    Updated(Resource),
    /// The stored version differed from the expected one.
    Stale,
    NotFound,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    /// Insert a new record
    async fn insert(&self, resource: &Resource) -> Result<(), RegistryError>;

    async fn find_by_id(&self, id: &ResourceId) -> Result<Option<Resource>, RegistryError>;

    /// Records of one owner and type, oldest first
    async fn page_by_owner_and_type(
        &self,
        owner_id: &str,
        kind: ResourceType,
        page: PageRequest,
    ) -> Result<Page<Resource>, RegistryError>;

    /// Replace the record if its stored version still equals `resource.version`.
    /// The stored copy gets `version + 1`.
    async fn update(&self, resource: &Resource) -> Result<UpdateOutcome, RegistryError>;

    /// Flip `handled` from false to true.
    /// Returns false when the record is missing or already handled.
    async fn mark_handled(&self, id: &ResourceId) -> Result<bool, RegistryError>;

    /// Returns whether a record was removed
    async fn delete_by_id(&self, id: &ResourceId) -> Result<bool, RegistryError>;
}
