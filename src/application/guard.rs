use crate::domain::{Action, Principal, Resource, User};
use crate::error::{ResourceError, ResourceResult};
use crate::ports::identity::UserDirectory;
use tracing::{debug, warn};

/// Authorization gate run before every registry operation.
#[derive(Clone)]
pub struct AccessGuard<U> {
    directory: U,
}

impl<U> AccessGuard<U>
where
    U: UserDirectory,
{
    pub fn new(directory: U) -> Self {
        Self { directory }
    }

    /// Resolve `principal` and check it holds `action` on `resource_ref`.
    /// Fails closed: no principal, no matching user or no grant all deny.
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        resource_ref: &str,
        action: Action,
    ) -> ResourceResult<User> {
        let principal = principal.ok_or(ResourceError::Unauthenticated)?;

        let user = match self.directory.find_by_name(&principal.username).await? {
            Some(user) => user,
            None => {
                warn!(username = %principal.username, "principal has no matching user");
                return Err(ResourceError::Forbidden);
            }
        };

        debug!(resource = resource_ref, permission = action.permission(), user = %user.name, "checking permission");
        if self
            .directory
            .has_permission(&user, resource_ref, action.permission())
            .await
        {
            Ok(user)
        } else {
            warn!(resource = resource_ref, permission = action.permission(), user = %user.name, "permission denied");
            Err(ResourceError::Forbidden)
        }
    }

    /// Route-level check using the action's own resource template.
    pub async fn authorize_action(
        &self,
        principal: Option<&Principal>,
        action: Action,
    ) -> ResourceResult<User> {
        self.authorize(principal, action.resource_template(), action)
            .await
    }
}

/// Record-level check: owners may do anything, others may only load public resources.
pub fn authorize_resource(user: &User, resource: &Resource, action: Action) -> ResourceResult<()> {
    if resource.is_owned_by(&user.id) || (action == Action::Load && resource.public) {
        Ok(())
    } else {
        warn!(resource_id = %resource.id, user = %user.name, action = %action, "resource access denied");
        Err(ResourceError::Forbidden)
    }
}
