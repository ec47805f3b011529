use crate::domain::User;
use crate::error::DirectoryError;
use async_trait::async_trait;

/// Maps principals to domain users and answers permission questions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, DirectoryError>;

    /// Whether `user` holds `permission` on the `resource` template
    async fn has_permission(&self, user: &User, resource: &str, permission: &str) -> bool;
}
