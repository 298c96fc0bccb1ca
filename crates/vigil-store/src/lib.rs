pub mod memory;

#[cfg(feature = "redis-store")]
pub mod redis_store;

pub use memory::MemorySampleStore;

#[cfg(feature = "redis-store")]
pub use redis_store::RedisSampleStore;

use anyhow::Result;
use async_trait::async_trait;

/// 记录更新函数：收到当前记录（不存在为 None），返回要写入的新记录；
/// 返回 None 表示放弃本次更新
pub type UpdateFn = dyn Fn(Option<&str>) -> Option<String> + Send + Sync;

/// 按分值排序的样本存储 trait，每个键对应一个有序集合
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// 追加一条带分值的记录
    async fn append(&self, key: &str, score: i64, payload: &str) -> Result<()>;

    /// 序列长度
    async fn cardinality(&self, key: &str) -> Result<u64>;

    /// 按分值区间读取（闭区间），按分值升序返回
    async fn range_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>>;

    /// 按分值区间删除（闭区间），返回删除条数
    async fn remove_by_score_range(&self, key: &str, min: i64, max: i64) -> Result<u64>;

    /// 按排名区间删除（0 为最旧记录，闭区间），返回删除条数
    async fn remove_by_rank_range(&self, key: &str, start: i64, stop: i64) -> Result<u64>;

    /// 对指定分值处的记录执行原子的读-改-写。
    /// 并发调用同一 (key, score) 时两次更新都必须生效，不允许丢失更新；
    /// 失败时旧记录保持原样，不会留下半成品。
    async fn update_at_score(&self, key: &str, score: i64, apply: &UpdateFn) -> Result<()>;
}
