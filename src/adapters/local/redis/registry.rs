//! Redis ResourceRegistry implementation.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use super::{owner_index_key, resource_key};
use crate::domain::{Page, PageRequest, Resource, ResourceId, ResourceType};
use crate::error::RegistryError;
use crate::ports::registry::{ResourceRegistry, UpdateOutcome};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::{self, AsyncCommands, Cmd};

/// KEYS: record, owner index. ARGV: json, version, score, member.
const INSERT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'data', ARGV[1], 'version', ARGV[2])
redis.call('ZADD', KEYS[2], ARGV[3], ARGV[4])
return 1
"#;

/// KEYS: record. ARGV: expected version, json, next version.
/// Returns 1 on write, 0 when missing, -1 when stale.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
if not current then
    return 0
end
if current ~= ARGV[1] then
    return -1
end
redis.call('HSET', KEYS[1], 'data', ARGV[2], 'version', ARGV[3])
return 1
"#;

/// Retries of the read-modify-write in `mark_handled` before giving up.
const MARK_HANDLED_ATTEMPTS: usize = 5;

/// `EVAL script numkeys key...`; callers append the ARGV values.
fn eval(script: &str, keys: &[String]) -> Cmd {
    let mut cmd = redis::cmd("EVAL");
    cmd.arg(script).arg(keys.len()).arg(keys);
    cmd
}

enum CasResult {
    Written,
    Missing,
    Stale,
}

impl RedisPool {
    async fn load(&self, id: &ResourceId) -> Result<Option<Resource>, RegistryError> {
        let mut conn = self.conn().await?;
        let (data, version): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(resource_key(id))
            .arg("data")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        match (data, version) {
            (Some(json), Some(version)) => {
                let mut resource: Resource = serde_json::from_str(&json)?;
                resource.version = version;
                Ok(Some(resource))
            }
            _ => Ok(None),
        }
    }

    /// Store `next` if the stored version still equals `expected`.
    async fn compare_and_set(
        &self,
        expected: u64,
        next: &Resource,
    ) -> Result<CasResult, RegistryError> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(next)?;
        let result: i64 = eval(COMPARE_AND_SET_SCRIPT, &[resource_key(&next.id)])
            .arg(expected)
            .arg(json)
            .arg(next.version)
            .query_async(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(match result {
            1 => CasResult::Written,
            0 => CasResult::Missing,
            _ => CasResult::Stale,
        })
    }
}

#[async_trait]
impl ResourceRegistry for RedisPool {
    async fn insert(&self, resource: &Resource) -> Result<(), RegistryError> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(resource)?;
        let keys = [
            resource_key(&resource.id),
            owner_index_key(&resource.owner_id, resource.kind),
        ];
        let inserted: i64 = eval(INSERT_SCRIPT, &keys)
            .arg(json)
            .arg(resource.version)
            .arg(resource.created_at.timestamp_millis())
            .arg(resource.id.to_string())
            .query_async(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        if inserted == 0 {
            return Err(RegistryError::Backend(format!(
                "resource {} already exists",
                resource.id
            )));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ResourceId) -> Result<Option<Resource>, RegistryError> {
        self.load(id).await
    }

    async fn page_by_owner_and_type(
        &self,
        owner_id: &str,
        kind: ResourceType,
        page: PageRequest,
    ) -> Result<Page<Resource>, RegistryError> {
        let index = owner_index_key(owner_id, kind);
        let (total, ids): (usize, Vec<String>) = {
            let mut conn = self.conn().await?;
            let total: usize = conn.zcard(&index).await.map_err(RedisAdapterError::from)?;
            let start = page.offset() as isize;
            let stop = start + page.size as isize - 1;
            let ids: Vec<String> = conn
                .zrange(&index, start, stop)
                .await
                .map_err(RedisAdapterError::from)?;
            (total, ids)
        };

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(id) = id.parse::<ResourceId>() else {
                continue;
            };
            // Index entries can briefly outlive a record being deleted.
            if let Some(resource) = self.load(&id).await? {
                items.push(resource);
            }
        }
        Ok(Page::new(items, page, total))
    }

    async fn update(&self, resource: &Resource) -> Result<UpdateOutcome, RegistryError> {
        let mut next = resource.clone();
        next.version = resource.version + 1;
        match self.compare_and_set(resource.version, &next).await? {
            CasResult::Written => Ok(UpdateOutcome::Updated(next)),
            CasResult::Missing => Ok(UpdateOutcome::NotFound),
            CasResult::Stale => Ok(UpdateOutcome::Stale),
        }
    }

    async fn mark_handled(&self, id: &ResourceId) -> Result<bool, RegistryError> {
        for _ in 0..MARK_HANDLED_ATTEMPTS {
            let Some(current) = self.load(id).await? else {
                return Ok(false);
            };
            if current.handled {
                return Ok(false);
            }

            let mut next = current.clone();
            next.handled = true;
            next.version = current.version + 1;
            next.updated_at = Utc::now();
            match self.compare_and_set(current.version, &next).await? {
                CasResult::Written => return Ok(true),
                CasResult::Missing => return Ok(false),
                CasResult::Stale => continue,
            }
        }
        Err(RegistryError::Backend(format!(
            "resource {} kept changing while marking it handled",
            id
        )))
    }

    async fn delete_by_id(&self, id: &ResourceId) -> Result<bool, RegistryError> {
        let Some(resource) = self.load(id).await? else {
            return Ok(false);
        };
        let mut conn = self.conn().await?;
        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .del(resource_key(id))
            .zrem(
                owner_index_key(&resource.owner_id, resource.kind),
                id.to_string(),
            )
            .query_async(&mut conn)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_packs_script_key_count_and_keys() {
        let keys = ["record".to_string(), "index".to_string()];
        let mut cmd = eval(INSERT_SCRIPT, &keys);
        cmd.arg("json");

        let packed = String::from_utf8(cmd.get_packed_command()).unwrap();
        assert!(packed.starts_with("*6\r\n$4\r\nEVAL\r\n"));
        assert!(packed.contains("\r\n$1\r\n2\r\n$6\r\nrecord\r\n$5\r\nindex\r\n$4\r\njson\r\n"));
    }
}
