use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{SampleStore, UpdateFn};

/// 一条序列：分值 -> 该分值下的记录集合（记录按字典序，与有序集合一致）
type Series = BTreeMap<i64, BTreeSet<String>>;

/// 内存版有序集合存储（用于开发和测试）
pub struct MemorySampleStore {
    series: Arc<RwLock<HashMap<String, Series>>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemorySampleStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 负排名按有序集合语义折算为从尾部数起
fn normalize_rank(rank: i64, len: i64) -> i64 {
    if rank < 0 {
        len + rank
    } else {
        rank
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn append(&self, key: &str, score: i64, payload: &str) -> Result<()> {
        let mut series = self.series.write().await;
        series
            .entry(key.to_string())
            .or_default()
            .entry(score)
            .or_default()
            .insert(payload.to_string());
        Ok(())
    }

    async fn cardinality(&self, key: &str) -> Result<u64> {
        let series = self.series.read().await;
        let count = series
            .get(key)
            .map(|s| s.values().map(|members| members.len() as u64).sum())
            .unwrap_or(0);
        Ok(count)
    }

    async fn range_by_score(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let series = self.series.read().await;
        let entries = series
            .get(key)
            .map(|s| {
                s.range(min..=max)
                    .flat_map(|(_, members)| members.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }

    async fn remove_by_score_range(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let mut series = self.series.write().await;
        let Some(entries) = series.get_mut(key) else {
            return Ok(0);
        };

        let scores: Vec<i64> = entries.range(min..=max).map(|(score, _)| *score).collect();
        let mut removed = 0;
        for score in scores {
            if let Some(members) = entries.remove(&score) {
                removed += members.len() as u64;
            }
        }

        if entries.is_empty() {
            series.remove(key);
        }
        Ok(removed)
    }

    async fn remove_by_rank_range(&self, key: &str, start: i64, stop: i64) -> Result<u64> {
        let mut series = self.series.write().await;
        let Some(entries) = series.get_mut(key) else {
            return Ok(0);
        };

        let len = entries.values().map(|members| members.len() as i64).sum();
        let start = normalize_rank(start, len).max(0);
        let stop = normalize_rank(stop, len).min(len - 1);
        if start > stop {
            return Ok(0);
        }

        let doomed: Vec<(i64, String)> = entries
            .iter()
            .flat_map(|(score, members)| members.iter().map(|m| (*score, m.clone())))
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .collect();

        let removed = doomed.len() as u64;
        for (score, member) in doomed {
            if let Some(members) = entries.get_mut(&score) {
                members.remove(&member);
                if members.is_empty() {
                    entries.remove(&score);
                }
            }
        }

        if entries.is_empty() {
            series.remove(key);
        }
        Ok(removed)
    }

    async fn update_at_score(&self, key: &str, score: i64, apply: &UpdateFn) -> Result<()> {
        // 写锁覆盖整个读-改-写，天然排除丢失更新
        let mut series = self.series.write().await;
        let entries = series.entry(key.to_string()).or_default();

        let current = entries
            .get(&score)
            .and_then(|members| members.iter().next().cloned());

        let Some(next) = apply(current.as_deref()) else {
            return Ok(());
        };

        let members = entries.entry(score).or_default();
        if let Some(old) = current {
            members.remove(&old);
        }
        members.insert(next);
        Ok(())
    }
}
