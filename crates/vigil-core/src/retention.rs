use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use vigil_store::SampleStore;
use vigil_types::{Resolution, ServerId};

use crate::keys::series_key;

/// 各分辨率的最大保留条数
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub max_raw: u64,
    pub max_hourly: u64,
    pub max_daily: u64,
}

impl RetentionPolicy {
    pub fn max_for(&self, resolution: Resolution) -> u64 {
        match resolution {
            Resolution::Raw => self.max_raw,
            Resolution::Hourly => self.max_hourly,
            Resolution::Daily => self.max_daily,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_raw: 1440,
            max_hourly: 168,
            max_daily: 365,
        }
    }
}

/// 一次保留裁剪的统计
#[derive(Debug, Clone)]
pub struct TrimStats {
    pub series_examined: u64,
    pub entries_removed: u64,
    pub failures: u64,
    pub execution_time_ms: i64,
    pub executed_at: DateTime<Utc>,
}

/// 保留裁剪器：把每条序列限制在策略允许的长度内，总是先淘汰最旧的记录
pub struct RetentionTrimmer {
    store: Arc<dyn SampleStore>,
    prefix: String,
    policy: RetentionPolicy,
}

impl RetentionTrimmer {
    pub fn new(store: Arc<dyn SampleStore>, prefix: String, policy: RetentionPolicy) -> Self {
        Self {
            store,
            prefix,
            policy,
        }
    }

    /// 扫描所有 (服务器 × 指标 × 分辨率) 组合并独立裁剪。
    /// 单条序列失败计入统计，不影响其余序列
    pub async fn trim_all(&self, servers: &[ServerId], metrics: &[String]) -> TrimStats {
        let start = std::time::Instant::now();
        let mut stats = TrimStats {
            series_examined: 0,
            entries_removed: 0,
            failures: 0,
            execution_time_ms: 0,
            executed_at: Utc::now(),
        };

        for server in servers {
            for metric in metrics {
                for resolution in Resolution::ALL {
                    let key = series_key(&self.prefix, server, resolution, metric);
                    stats.series_examined += 1;

                    match self.trim_series(&key, self.policy.max_for(resolution)).await {
                        Ok(removed) => stats.entries_removed += removed,
                        Err(e) => {
                            warn!(key = %key, error = %e, "Series trim failed");
                            stats.failures += 1;
                        }
                    }
                }
            }
        }

        stats.execution_time_ms = start.elapsed().as_millis() as i64;

        info!(
            series = stats.series_examined,
            removed = stats.entries_removed,
            failures = stats.failures,
            elapsed_ms = stats.execution_time_ms,
            "Retention pass completed"
        );

        stats
    }

    /// 裁剪单条序列：长度超过 max 时删除排名 [0, count-max-1] 的最旧记录。
    /// 没有新写入时重复执行是无操作
    pub async fn trim_series(&self, key: &str, max: u64) -> Result<u64> {
        let count = self.store.cardinality(key).await?;
        if count <= max {
            return Ok(0);
        }

        let excess = count - max;
        let removed = self
            .store
            .remove_by_rank_range(key, 0, excess as i64 - 1)
            .await?;

        debug!(key = %key, removed = removed, remaining = max, "Series trimmed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_store::MemorySampleStore;

    fn trimmer(policy: RetentionPolicy) -> (Arc<MemorySampleStore>, RetentionTrimmer) {
        let store = Arc::new(MemorySampleStore::new());
        let trimmer = RetentionTrimmer::new(store.clone(), "status:".to_string(), policy);
        (store, trimmer)
    }

    #[tokio::test]
    async fn test_trim_removes_oldest_entries() {
        let (store, trimmer) = trimmer(RetentionPolicy::default());

        for (score, payload) in [(10, "a"), (20, "b"), (30, "c"), (40, "d")] {
            store.append("k", score, payload).await.unwrap();
        }

        let removed = trimmer.trim_series("k", 3).await.unwrap();
        assert_eq!(removed, 1);

        let rest = store.range_by_score("k", i64::MIN, i64::MAX).await.unwrap();
        assert_eq!(rest, vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_trim_keeps_exactly_max_newest() {
        let (store, trimmer) = trimmer(RetentionPolicy::default());

        for score in 0..10 {
            store
                .append("k", score, &format!("p{}", score))
                .await
                .unwrap();
        }

        trimmer.trim_series("k", 4).await.unwrap();

        let rest = store.range_by_score("k", i64::MIN, i64::MAX).await.unwrap();
        assert_eq!(rest, vec!["p6", "p7", "p8", "p9"]);
    }

    #[tokio::test]
    async fn test_trim_under_max_is_noop() {
        let (store, trimmer) = trimmer(RetentionPolicy::default());

        store.append("k", 10, "a").await.unwrap();

        let removed = trimmer.trim_series("k", 3).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.cardinality("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trim_is_idempotent() {
        let (store, trimmer) = trimmer(RetentionPolicy::default());

        for score in 0..6 {
            store
                .append("k", score, &format!("p{}", score))
                .await
                .unwrap();
        }

        let first = trimmer.trim_series("k", 3).await.unwrap();
        let second = trimmer.trim_series("k", 3).await.unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert_eq!(store.cardinality("k").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trim_all_covers_every_combination() {
        let policy = RetentionPolicy {
            max_raw: 2,
            max_hourly: 2,
            max_daily: 2,
        };
        let (store, trimmer) = trimmer(policy);

        let server = ServerId::new("127.0.0.1".to_string(), 6379);
        let metrics = vec!["used_memory".to_string(), "connected_clients".to_string()];

        for metric in &metrics {
            for resolution in Resolution::ALL {
                let key = series_key("status:", &server, resolution, metric);
                for score in 0..5 {
                    store
                        .append(&key, score, &format!("p{}", score))
                        .await
                        .unwrap();
                }
            }
        }

        let stats = trimmer.trim_all(&[server.clone()], &metrics).await;

        assert_eq!(stats.series_examined, 6);
        assert_eq!(stats.entries_removed, 18);
        assert_eq!(stats.failures, 0);

        for metric in &metrics {
            for resolution in Resolution::ALL {
                let key = series_key("status:", &server, resolution, metric);
                assert_eq!(store.cardinality(&key).await.unwrap(), 2);
            }
        }
    }
}
