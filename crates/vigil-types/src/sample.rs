use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::server::ServerId;
use crate::value::MetricValue;

/// 序列分辨率：原始样本、小时桶、天桶
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Raw,
    Hourly,
    Daily,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Raw, Resolution::Hourly, Resolution::Daily];

    /// 存储键中的分辨率段，原始序列没有
    pub fn key_segment(&self) -> Option<&'static str> {
        match self {
            Resolution::Raw => None,
            Resolution::Hourly => Some("hourly"),
            Resolution::Daily => Some("daily"),
        }
    }

    /// 把时间戳截断到所在窗口的起点（UTC）
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let window = match self {
            Resolution::Raw => return ts,
            Resolution::Hourly => Duration::hours(1),
            Resolution::Daily => Duration::days(1),
        };
        ts.duration_trunc(window).unwrap_or(ts)
    }
}

/// 过滤后的规范化样本
#[derive(Debug, Clone)]
pub struct StatusSample {
    pub server: ServerId,
    pub metric: String,
    pub value: MetricValue,
    pub timestamp: DateTime<Utc>,
}

impl StatusSample {
    pub fn new(server: ServerId, metric: String, value: MetricValue) -> Self {
        Self {
            server,
            metric,
            value,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 样本在原始序列中的分值（毫秒时间戳）
    pub fn score(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// 小时/天分辨率下的聚合桶：运行均值加样本数
///
/// 一个截断时间戳对应一个桶，窗口内到达新样本时原地更新，
/// 均值递推对任意到达顺序保持精确。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(rename = "value")]
    pub mean: f64,
    pub n: u64,
}

impl Bucket {
    /// 以窗口内的第一个样本建桶
    pub fn new(value: f64) -> Self {
        Self { mean: value, n: 1 }
    }

    /// 并入一个新样本
    pub fn absorb(&self, value: f64) -> Self {
        let n = self.n + 1;
        Self {
            mean: (self.mean * self.n as f64 + value) / n as f64,
            n,
        }
    }
}
