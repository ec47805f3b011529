//! In-memory ResourceRegistry implementation.

use crate::domain::{Page, PageRequest, Resource, ResourceId, ResourceType};
use crate::error::RegistryError;
use crate::ports::registry::{ResourceRegistry, UpdateOutcome};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local registry. Every write happens under one lock, which makes
/// the compare-and-set operations trivially atomic.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    records: Arc<Mutex<HashMap<ResourceId, Resource>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ResourceId, Resource>>, RegistryError> {
        self.records
            .lock()
            .map_err(|_| RegistryError::Backend("registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl ResourceRegistry for InMemoryRegistry {
    async fn insert(&self, resource: &Resource) -> Result<(), RegistryError> {
        let mut records = self.lock()?;
        if records.contains_key(&resource.id) {
            return Err(RegistryError::Backend(format!(
                "resource {} already exists",
                resource.id
            )));
        }
        records.insert(resource.id, resource.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ResourceId) -> Result<Option<Resource>, RegistryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn page_by_owner_and_type(
        &self,
        owner_id: &str,
        kind: ResourceType,
        page: PageRequest,
    ) -> Result<Page<Resource>, RegistryError> {
        let records = self.lock()?;
        let mut matching: Vec<&Resource> = records
            .values()
            .filter(|r| r.owner_id == owner_id && r.kind == kind)
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn update(&self, resource: &Resource) -> Result<UpdateOutcome, RegistryError> {
        let mut records = self.lock()?;
        match records.get_mut(&resource.id) {
            None => Ok(UpdateOutcome::NotFound),
            Some(stored) if stored.version != resource.version => Ok(UpdateOutcome::Stale),
            Some(stored) => {
                let mut next = resource.clone();
                next.version = stored.version + 1;
                *stored = next.clone();
                Ok(UpdateOutcome::Updated(next))
            }
        }
    }

    async fn mark_handled(&self, id: &ResourceId) -> Result<bool, RegistryError> {
        let mut records = self.lock()?;
        match records.get_mut(id) {
            Some(stored) if !stored.handled => {
                stored.handled = true;
                stored.version += 1;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: &ResourceId) -> Result<bool, RegistryError> {
        Ok(self.lock()?.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paging_is_ordered_and_bounded() {
        let registry = InMemoryRegistry::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut resource = Resource::new("u1", ResourceType::Audio, "audio/mpeg", "a.mp3");
            resource.created_at = resource.created_at + chrono::Duration::seconds(i);
            ids.push(resource.id);
            registry.insert(&resource).await.unwrap();
        }

        let first = registry
            .page_by_owner_and_type("u1", ResourceType::Audio, PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.iter().map(|r| r.id).collect::<Vec<_>>(), ids[..2].to_vec());

        let last = registry
            .page_by_owner_and_type("u1", ResourceType::Audio, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[4]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let registry = InMemoryRegistry::new();
        let resource = Resource::new("u1", ResourceType::Image, "image/png", "a.png");
        registry.insert(&resource).await.unwrap();
        assert!(registry.insert(&resource).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_handled_is_monotonic() {
        let registry = InMemoryRegistry::new();
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        registry.insert(&resource).await.unwrap();

        assert!(registry.mark_handled(&resource.id).await.unwrap());
        assert!(!registry.mark_handled(&resource.id).await.unwrap());

        let stored = registry.find_by_id(&resource.id).await.unwrap().unwrap();
        assert!(stored.handled);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_update_compares_versions() {
        let registry = InMemoryRegistry::new();
        let resource = Resource::new("u1", ResourceType::Video, "video/mp4", "a.mp4");
        registry.insert(&resource).await.unwrap();

        let mut change = resource.clone();
        change.public = true;
        let outcome = registry.update(&change).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(ref r) if r.version == 1 && r.public));

        assert_eq!(registry.update(&change).await.unwrap(), UpdateOutcome::Stale);

        registry.delete_by_id(&resource.id).await.unwrap();
        assert_eq!(registry.update(&change).await.unwrap(), UpdateOutcome::NotFound);
    }
}
