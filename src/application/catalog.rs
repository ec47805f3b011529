use super::guard::{authorize_resource, AccessGuard};
use crate::domain::{Action, Page, PageRequest, Principal, Resource, ResourceId, ResourceType};
use crate::error::{ResourceError, ResourceResult};
use crate::ports::identity::UserDirectory;
use crate::ports::registry::{ResourceRegistry, UpdateOutcome};
use chrono::Utc;
use tracing::info;

/// Guarded reads and the visibility toggle.
#[derive(Clone)]
pub struct ResourceCatalog<R, U> {
    guard: AccessGuard<U>,
    registry: R,
}

impl<R, U> ResourceCatalog<R, U>
where
    R: ResourceRegistry,
    U: UserDirectory,
{
    pub fn new(guard: AccessGuard<U>, registry: R) -> Self {
        Self { guard, registry }
    }

    /// The caller's own resources of one type.
    pub async fn list(
        &self,
        principal: Option<&Principal>,
        kind: ResourceType,
        page: PageRequest,
    ) -> ResourceResult<Page<Resource>> {
        let user = self.guard.authorize_action(principal, Action::List).await?;
        Ok(self
            .registry
            .page_by_owner_and_type(&user.id, kind, page)
            .await?)
    }

    pub async fn load(
        &self,
        principal: Option<&Principal>,
        resource_id: &ResourceId,
    ) -> ResourceResult<Resource> {
        let user = self.guard.authorize_action(principal, Action::Load).await?;
        let resource = self.find(resource_id).await?;
        authorize_resource(&user, &resource, Action::Load)?;
        Ok(resource)
    }

    /// Flip the public/private flag. Applying it twice restores the original value.
    pub async fn toggle_public(
        &self,
        principal: Option<&Principal>,
        resource_id: &ResourceId,
    ) -> ResourceResult<Resource> {
        let user = self
            .guard
            .authorize_action(principal, Action::PublicToggle)
            .await?;
        let mut resource = self.find(resource_id).await?;
        authorize_resource(&user, &resource, Action::PublicToggle)?;

        resource.public = !resource.public;
        resource.updated_at = Utc::now();

        match self.registry.update(&resource).await? {
            UpdateOutcome::Updated(stored) => {
                info!(kind = %stored.kind, path = %stored.relative_path, public = stored.public, "toggled visibility");
                Ok(stored)
            }
            UpdateOutcome::Stale => Err(ResourceError::Conflict(*resource_id)),
            UpdateOutcome::NotFound => Err(ResourceError::NotFound(*resource_id)),
        }
    }

    async fn find(&self, resource_id: &ResourceId) -> ResourceResult<Resource> {
        self.registry
            .find_by_id(resource_id)
            .await?
            .ok_or(ResourceError::NotFound(*resource_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::memory::InMemoryRegistry;
    use crate::domain::{Grant, User};
    use crate::ports::identity::MockUserDirectory;
    use crate::ports::registry::MockResourceRegistry;

    fn directory() -> MockUserDirectory {
        let mut directory = MockUserDirectory::new();
        directory.expect_find_by_name().returning(|name| {
            let (id, grants) = match name {
                "alice" => ("1", vec![Grant::new("/static-resource/**", "static-resource:*")]),
                "bob" => ("2", vec![Grant::new("/static-resource/**", "static-resource:*")]),
                _ => ("3", vec![Grant::new("/static-resource/type/{type}", "static-resource:list")]),
            };
            Ok(Some(User {
                id: id.to_string(),
                name: name.to_string(),
                grants,
            }))
        });
        directory
            .expect_has_permission()
            .returning(|user, resource, permission| user.can(resource, permission));
        directory
    }

    fn catalog(registry: &InMemoryRegistry) -> ResourceCatalog<InMemoryRegistry, MockUserDirectory> {
        ResourceCatalog::new(AccessGuard::new(directory()), registry.clone())
    }

    async fn insert(registry: &InMemoryRegistry, owner: &str, kind: ResourceType) -> Resource {
        let resource = Resource::new(owner, kind, "video/mp4", "clip.mp4");
        registry.insert(&resource).await.unwrap();
        resource
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_visibility() {
        let registry = InMemoryRegistry::new();
        let catalog = catalog(&registry);
        let resource = insert(&registry, "1", ResourceType::Video).await;
        let alice = Principal::new("alice");

        let once = catalog.toggle_public(Some(&alice), &resource.id).await.unwrap();
        assert!(once.public);
        let twice = catalog.toggle_public(Some(&alice), &resource.id).await.unwrap();
        assert!(!twice.public);
        assert_eq!(twice.version, resource.version + 2);
    }

    #[tokio::test]
    async fn test_private_resource_hidden_from_others() {
        let registry = InMemoryRegistry::new();
        let catalog = catalog(&registry);
        let resource = insert(&registry, "1", ResourceType::Image).await;
        let alice = Principal::new("alice");
        let bob = Principal::new("bob");

        assert!(matches!(
            catalog.load(Some(&bob), &resource.id).await,
            Err(ResourceError::Forbidden)
        ));

        catalog.toggle_public(Some(&alice), &resource.id).await.unwrap();
        let loaded = catalog.load(Some(&bob), &resource.id).await.unwrap();
        assert_eq!(loaded.id, resource.id);

        assert!(matches!(
            catalog.toggle_public(Some(&bob), &resource.id).await,
            Err(ResourceError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_list_only_returns_own_resources_of_type() {
        let registry = InMemoryRegistry::new();
        let catalog = catalog(&registry);
        insert(&registry, "1", ResourceType::Video).await;
        insert(&registry, "1", ResourceType::Video).await;
        insert(&registry, "1", ResourceType::Audio).await;
        insert(&registry, "2", ResourceType::Video).await;

        let alice = Principal::new("alice");
        let page = catalog
            .list(Some(&alice), ResourceType::Video, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|r| r.owner_id == "1" && r.kind == ResourceType::Video));
    }

    #[tokio::test]
    async fn test_load_without_permission_is_forbidden() {
        let registry = InMemoryRegistry::new();
        let catalog = catalog(&registry);
        let resource = insert(&registry, "3", ResourceType::Video).await;

        let carol = Principal::new("carol");
        assert!(matches!(
            catalog.load(Some(&carol), &resource.id).await,
            Err(ResourceError::Forbidden)
        ));
        assert!(catalog
            .list(Some(&carol), ResourceType::Video, PageRequest::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_load_unknown_is_not_found() {
        let registry = InMemoryRegistry::new();
        let catalog = catalog(&registry);
        let alice = Principal::new("alice");
        let id = uuid::Uuid::new_v4();
        assert!(matches!(
            catalog.load(Some(&alice), &id).await,
            Err(ResourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_update_is_conflict() {
        let resource = Resource::new("1", ResourceType::Video, "video/mp4", "clip.mp4");
        let stored = resource.clone();

        // Another writer bumps the version between the read and the write.
        let mut registry = MockResourceRegistry::new();
        registry
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        registry
            .expect_update()
            .withf(|candidate| candidate.public)
            .times(1)
            .returning(|_| Ok(UpdateOutcome::Stale));
        let catalog = ResourceCatalog::new(AccessGuard::new(directory()), registry);

        let alice = Principal::new("alice");
        let result = catalog.toggle_public(Some(&alice), &resource.id).await;
        assert!(matches!(result, Err(ResourceError::Conflict(id)) if id == resource.id));
    }
}
