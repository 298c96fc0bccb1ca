use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use vigil_core::{expand_fields, parse_status, MetricFilter, RetentionTrimmer, RollupRecorder};
use vigil_types::ServerId;

use crate::source::StatusSource;

/// 周期任务句柄
pub struct TaskHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

impl TaskHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join_handle.await;
    }

    pub fn abort(self) {
        self.join_handle.abort();
    }
}

/// 状态监控服务。
///
/// 采样任务和保留任务是两个相互独立、可单独取消的周期任务，
/// 只通过样本存储产生联系。
pub struct MonitorService {
    source: Arc<dyn StatusSource>,
    recorder: Arc<RollupRecorder>,
    trimmer: Arc<RetentionTrimmer>,
    filter: Arc<MetricFilter>,
    servers: Vec<ServerId>,
    metrics: Vec<String>,
    sample_interval_secs: u64,
    retention_interval_secs: u64,
}

impl MonitorService {
    pub fn new(
        source: Arc<dyn StatusSource>,
        recorder: RollupRecorder,
        trimmer: RetentionTrimmer,
        filter: MetricFilter,
        servers: Vec<ServerId>,
        metrics: Vec<String>,
        sample_interval_secs: u64,
        retention_interval_secs: u64,
    ) -> Self {
        Self {
            source,
            recorder: Arc::new(recorder),
            trimmer: Arc::new(trimmer),
            filter: Arc::new(filter),
            servers,
            metrics,
            sample_interval_secs,
            retention_interval_secs,
        }
    }

    /// 执行一轮采样：每台服务器派生一个独立任务并发执行，
    /// 慢速或失联的服务器不拖累其他服务器
    pub async fn sample_all(&self) {
        let mut handles = Vec::new();
        for server in self.servers.clone() {
            let source = self.source.clone();
            let recorder = self.recorder.clone();
            let filter = self.filter.clone();
            handles.push(tokio::spawn(async move {
                Self::sample_server(source, recorder, filter, server).await;
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Per-server sampling task panicked");
            }
        }
    }

    /// 采样一台服务器：获取状态、解析、过滤、写入。
    /// 获取失败只跳过本台服务器的本轮采样
    async fn sample_server(
        source: Arc<dyn StatusSource>,
        recorder: Arc<RollupRecorder>,
        filter: Arc<MetricFilter>,
        server: ServerId,
    ) {
        let blob = match source.fetch_status(&server).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(server = %server, error = %e, "Status retrieval failed, skipping tick");
                return;
            }
        };

        let now = Utc::now();
        let pairs = expand_fields(parse_status(&blob));
        let samples = filter.select(&server, pairs, now);
        debug!(server = %server, samples = samples.len(), "Status sampled");

        for sample in &samples {
            recorder.record(sample).await;
        }
    }

    /// 启动采样任务
    pub fn start_sampling_task(self: Arc<Self>) -> TaskHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        info!(interval_secs = self.sample_interval_secs, "Sampling task started");

        let join_handle = tokio::spawn(async move {
            let mut interval = interval(tokio::time::Duration::from_secs(self.sample_interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.sample_all().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        TaskHandle {
            shutdown_tx,
            join_handle,
        }
    }

    /// 启动保留裁剪任务
    pub fn start_retention_task(self: Arc<Self>) -> TaskHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        info!(interval_secs = self.retention_interval_secs, "Retention task started");

        let join_handle = tokio::spawn(async move {
            let mut interval =
                interval(tokio::time::Duration::from_secs(self.retention_interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.trimmer.trim_all(&self.servers, &self.metrics).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        TaskHandle {
            shutdown_tx,
            join_handle,
        }
    }
}
