use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use vigil_store::SampleStore;
use vigil_types::{Bucket, Resolution, StatusSample};

use crate::keys::series_key;

/// 汇总记录器：写入原始样本并维护小时/天桶的增量均值。
///
/// 桶状态每次都从存储里现读，进程重启不会丢失窗口内已累计的均值。
pub struct RollupRecorder {
    store: Arc<dyn SampleStore>,
    prefix: String,
}

impl RollupRecorder {
    pub fn new(store: Arc<dyn SampleStore>, prefix: String) -> Self {
        Self { store, prefix }
    }

    /// 处理一条规范化样本：先写原始序列，再更新两个聚合桶。
    /// 单个分辨率写入失败只记录日志，不影响同一样本的其余写入
    pub async fn record(&self, sample: &StatusSample) {
        if let Err(e) = self.write_raw(sample).await {
            warn!(
                server = %sample.server,
                metric = %sample.metric,
                error = %e,
                "Raw sample write failed"
            );
        }

        match sample.value.as_numeric() {
            Some(value) => {
                for resolution in [Resolution::Hourly, Resolution::Daily] {
                    if let Err(e) = self.update_bucket(sample, resolution, value).await {
                        warn!(
                            server = %sample.server,
                            metric = %sample.metric,
                            resolution = ?resolution,
                            error = %e,
                            "Bucket update failed"
                        );
                    }
                }
            }
            None => {
                // 文本值没有均值可言，聚合分辨率按无操作处理
                debug!(
                    server = %sample.server,
                    metric = %sample.metric,
                    "Non-numeric value, skipping averaged resolutions"
                );
            }
        }
    }

    /// 追加原始样本：payload 为 `{ISO 时间戳: 值}`，分值为毫秒时间戳
    pub async fn write_raw(&self, sample: &StatusSample) -> Result<()> {
        let key = series_key(&self.prefix, &sample.server, Resolution::Raw, &sample.metric);
        let payload = json!({
            (sample.timestamp.to_rfc3339()): sample.value.to_string()
        })
        .to_string();

        self.store.append(&key, sample.score(), &payload).await?;

        debug!(key = %key, score = sample.score(), "Raw sample written");
        Ok(())
    }

    /// 更新聚合桶：窗口内首个样本建桶，其余按精确均值递推并入。
    /// 读-改-写走存储的原子原语，重叠的采样周期不会互相覆盖
    pub async fn update_bucket(
        &self,
        sample: &StatusSample,
        resolution: Resolution,
        value: f64,
    ) -> Result<()> {
        let key = series_key(&self.prefix, &sample.server, resolution, &sample.metric);
        let window = resolution.truncate(sample.timestamp);
        let score = window.timestamp_millis();

        self.store
            .update_at_score(&key, score, &move |current| {
                let bucket = match current {
                    Some(raw) => match serde_json::from_str::<Bucket>(raw) {
                        Ok(existing) => existing.absorb(value),
                        Err(_) => {
                            warn!(payload = %raw, "Unreadable bucket payload, reseeding");
                            Bucket::new(value)
                        }
                    },
                    None => Bucket::new(value),
                };
                serde_json::to_string(&bucket).ok()
            })
            .await?;

        debug!(key = %key, score = score, "Bucket updated");
        Ok(())
    }
}
