//! Redis adapter errors, folded into the port errors at the boundary.

use crate::error::{MessagingError, RegistryError};
use deadpool_redis::redis::RedisError;
use deadpool_redis::{CreatePoolError, PoolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedisAdapterError {
    #[error("redis command failed: {0}")]
    Redis(#[from] RedisError),
    #[error("no redis connection available: {0}")]
    Pool(#[from] PoolError),
    #[error("invalid redis pool settings: {0}")]
    CreatePool(#[from] CreatePoolError),
}

impl From<RedisAdapterError> for RegistryError {
    fn from(err: RedisAdapterError) -> Self {
        RegistryError::Backend(err.to_string())
    }
}

impl From<RedisAdapterError> for MessagingError {
    fn from(err: RedisAdapterError) -> Self {
        MessagingError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadpool_redis::redis::ErrorKind;

    #[test]
    fn test_redis_failure_becomes_backend_error() {
        let err: RedisAdapterError = RedisError::from((ErrorKind::IoError, "connection reset")).into();
        assert!(matches!(err, RedisAdapterError::Redis(_)));

        let registry: RegistryError = err.into();
        match registry {
            RegistryError::Backend(detail) => {
                assert!(detail.starts_with("redis command failed"));
                assert!(detail.contains("connection reset"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
