//! User directory backed by a JSON users file.
//!
//! The file holds an array of users with their grants:
//!
//! ```json
//! [
//!   {
//!     "id": "1",
//!     "name": "alice",
//!     "grants": [{ "resource": "/static-resource/**", "permission": "static-resource:*" }]
//!   }
//! ]
//! ```

use crate::domain::User;
use crate::error::DirectoryError;
use crate::ports::identity::UserDirectory;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug, Default)]
pub struct JsonUserDirectory {
    users: Arc<HashMap<String, User>>,
}

impl JsonUserDirectory {
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.name.clone(), user))
            .collect();
        Self {
            users: Arc::new(users),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let users: Vec<User> = serde_json::from_slice(&raw)?;
        info!(path = %path.display(), users = users.len(), "loaded users file");
        Ok(Self::from_users(users))
    }
}

#[async_trait]
impl UserDirectory for JsonUserDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.get(name).cloned())
    }

    async fn has_permission(&self, user: &User, resource: &str, permission: &str) -> bool {
        user.can(resource, permission)
    }
}
