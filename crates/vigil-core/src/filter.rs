use chrono::{DateTime, Utc};
use std::collections::HashSet;

use vigil_types::{MetricValue, ServerId, StatusSample};

/// 跟踪指标过滤器：按配置的允许清单选取展开后的指标并生成规范化样本。
/// 清单成员按（可能是复合的）指标名精确匹配
pub struct MetricFilter {
    tracked: HashSet<String>,
}

impl MetricFilter {
    pub fn new(tracked: Vec<String>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
        }
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    /// 选取允许清单中的指标。
    /// 不能解析为有限数值的值保持文本形态，只进入原始序列
    pub fn select(
        &self,
        server: &ServerId,
        pairs: Vec<(String, MetricValue)>,
        timestamp: DateTime<Utc>,
    ) -> Vec<StatusSample> {
        pairs
            .into_iter()
            .filter(|(name, _)| self.tracked.contains(name))
            .map(|(name, value)| {
                StatusSample::new(server.clone(), name, value).with_timestamp(timestamp)
            })
            .collect()
    }
}
