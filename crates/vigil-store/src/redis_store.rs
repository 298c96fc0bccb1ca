use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::{SampleStore, UpdateFn};

/// 乐观并发替换脚本：旧记录仍然匹配时，原子地换入新记录。
/// ARGV[1] 为分值，ARGV[2] 为期望的旧记录（空串表示不存在），ARGV[3] 为新记录
const CAS_SCRIPT: &str = r#"
local cur = redis.call('ZRANGEBYSCORE', KEYS[1], ARGV[1], ARGV[1], 'LIMIT', 0, 1)[1]
if cur == ARGV[2] or (not cur and ARGV[2] == '') then
    if cur then
        redis.call('ZREM', KEYS[1], cur)
    end
    redis.call('ZADD', KEYS[1], ARGV[1], ARGV[3])
    return 1
end
return 0
"#;

/// 放弃前的重试次数
const CAS_MAX_RETRIES: usize = 16;

/// Redis 有序集合存储
pub struct RedisSampleStore {
    client: redis::Client,
    cas_script: redis::Script,
}

impl RedisSampleStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            cas_script: redis::Script::new(CAS_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl SampleStore for RedisSampleStore {
    async fn append(&self, key: &str, score: i64, payload: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.zadd(key, payload, score).await?;
        Ok(())
    }

    async fn cardinality(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn range_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let entries: Vec<String> = conn.zrangebyscore(key, min, max).await?;
        Ok(entries)
    }

    async fn remove_by_score_range(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.zrembyscore(key, min, max).await?;
        Ok(removed)
    }

    async fn remove_by_rank_range(&self, key: &str, start: i64, stop: i64) -> Result<u64> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn
            .zremrangebyrank(key, start as isize, stop as isize)
            .await?;
        Ok(removed)
    }

    async fn update_at_score(&self, key: &str, score: i64, apply: &UpdateFn) -> Result<()> {
        let mut conn = self.connection().await?;

        for _ in 0..CAS_MAX_RETRIES {
            let current: Vec<String> = conn.zrangebyscore_limit(key, score, score, 0, 1).await?;
            let current = current.first().map(|entry| entry.as_str());

            let Some(next) = apply(current) else {
                return Ok(());
            };

            let swapped: i32 = self
                .cas_script
                .key(key)
                .arg(score)
                .arg(current.unwrap_or(""))
                .arg(&next)
                .invoke_async(&mut conn)
                .await?;
            if swapped == 1 {
                return Ok(());
            }

            // 另一个写入者抢先改了这条记录，拿新值重来
            debug!(key = %key, score = score, "Concurrent update detected, retrying");
        }

        Err(anyhow!(
            "update_at_score for {} gave up after {} contended attempts",
            key,
            CAS_MAX_RETRIES
        ))
    }
}
