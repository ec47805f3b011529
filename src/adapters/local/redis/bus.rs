//! Redis DispatchPort and WorkerPort implementations.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use super::{
    delete_response_key, request_queue_key, CONVERT_RESPONSE_QUEUE, DELETE_RESPONSE_TTL_SECS,
};
use crate::domain::{
    ConvertRequest, ConvertResponse, DeleteRequest, DeleteResponse, ResourceType, WorkerRequest,
};
use crate::error::MessagingError;
use crate::ports::messaging::{DispatchPort, WorkerPort};
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// BRPOP treats 0 as "block forever".
fn block_secs(timeout: Duration) -> f64 {
    timeout.as_secs_f64().max(0.01)
}

impl RedisPool {
    async fn push_json<T: serde::Serialize>(
        &self,
        queue: &str,
        item: &T,
    ) -> Result<(), MessagingError> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(item)?;
        conn.lpush::<_, _, ()>(queue, json)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }

    async fn pop_json<T: DeserializeOwned>(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<T>, MessagingError> {
        let mut conn = self.conn().await?;
        let result: Option<(String, String)> = conn
            .brpop(queue, block_secs(timeout))
            .await
            .map_err(RedisAdapterError::from)?;
        match result {
            Some((_, json)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DispatchPort for RedisPool {
    async fn send_convert(&self, request: ConvertRequest) -> Result<(), MessagingError> {
        let queue = request_queue_key(request.resource.kind);
        self.push_json(&queue, &WorkerRequest::Convert(request))
            .await
    }

    async fn request_delete(
        &self,
        request: DeleteRequest,
        timeout: Duration,
    ) -> Result<DeleteResponse, MessagingError> {
        let request_id = request.id.clone();
        let queue = request_queue_key(request.resource.kind);
        self.push_json(&queue, &WorkerRequest::Delete(request))
            .await?;

        let reply_key = delete_response_key(&request_id);
        let reply: Option<DeleteResponse> = self.pop_json(&reply_key, timeout).await?;
        match reply {
            Some(response) => Ok(response),
            None => Err(MessagingError::Timeout(request_id)),
        }
    }

    async fn next_convert_response(
        &self,
        timeout: Duration,
    ) -> Result<Option<ConvertResponse>, MessagingError> {
        self.pop_json(CONVERT_RESPONSE_QUEUE, timeout).await
    }
}

#[async_trait]
impl WorkerPort for RedisPool {
    async fn next_request(
        &self,
        kind: ResourceType,
        timeout: Duration,
    ) -> Result<Option<WorkerRequest>, MessagingError> {
        self.pop_json(&request_queue_key(kind), timeout).await
    }

    async fn reply_convert(&self, response: ConvertResponse) -> Result<(), MessagingError> {
        self.push_json(CONVERT_RESPONSE_QUEUE, &response).await
    }

    async fn reply_delete(&self, response: DeleteResponse) -> Result<(), MessagingError> {
        let mut conn = self.conn().await?;
        let key = delete_response_key(&response.request_id);
        let json = serde_json::to_string(&response)?;
        // The reply list expires so a reply nobody waits for anymore is not kept.
        let _: () = redis::pipe()
            .atomic()
            .lpush(&key, json)
            .ignore()
            .expire(&key, DELETE_RESPONSE_TTL_SECS)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_secs_never_blocks_forever() {
        assert_eq!(block_secs(Duration::from_secs(5)), 5.0);
        assert!(block_secs(Duration::ZERO) > 0.0);
    }
}
