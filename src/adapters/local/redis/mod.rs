//! Redis adapter for local deployment.
//!
//! This module provides Redis-backed implementations of:
//! - `ResourceRegistry` for resource records
//! - `DispatchPort` and `WorkerPort` for the conversion worker queues
//!
//! A record lives in a hash holding its JSON (`data`) and its `version`, so the
//! compare-and-set scripts never have to decode JSON server side.

mod bus;
mod error;
mod pool;
mod registry;

pub use error::RedisAdapterError;
pub use pool::RedisPool;

use crate::domain::{ResourceId, ResourceType};

/// Redis key constants
const RESOURCE_PREFIX: &str = "static-resource:resource:";
const OWNER_INDEX_PREFIX: &str = "static-resource:owner:";
const REQUEST_QUEUE_PREFIX: &str = "static-resource:requests:";
const CONVERT_RESPONSE_QUEUE: &str = "static-resource:responses:convert";
const DELETE_RESPONSE_PREFIX: &str = "static-resource:responses:delete:";

/// Seconds an unread delete reply survives.
const DELETE_RESPONSE_TTL_SECS: i64 = 300;

fn resource_key(id: &ResourceId) -> String {
    format!("{}{}", RESOURCE_PREFIX, id)
}

fn owner_index_key(owner_id: &str, kind: ResourceType) -> String {
    format!("{}{}:{}", OWNER_INDEX_PREFIX, owner_id, kind)
}

fn request_queue_key(kind: ResourceType) -> String {
    format!("{}{}", REQUEST_QUEUE_PREFIX, kind)
}

fn delete_response_key(request_id: &str) -> String {
    format!("{}{}", DELETE_RESPONSE_PREFIX, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            resource_key(&id),
            "static-resource:resource:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            owner_index_key("7", ResourceType::Audio),
            "static-resource:owner:7:audio"
        );
        assert_eq!(
            request_queue_key(ResourceType::Video),
            "static-resource:requests:video"
        );
        assert_eq!(
            delete_response_key("abc"),
            "static-resource:responses:delete:abc"
        );
    }
}
