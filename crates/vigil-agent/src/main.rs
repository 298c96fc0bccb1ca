use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use vigil_agent::config::AgentConfig;
use vigil_agent::service::MonitorService;
use vigil_agent::source::InfoCommandSource;
use vigil_core::{MetricFilter, RetentionTrimmer, RollupRecorder};
use vigil_store::RedisSampleStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    info!("Starting vigil-agent");

    // 加载并校验配置
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/vigil.toml".to_string());
    let config = AgentConfig::load(&config_path)?;
    config.validate()?;

    // 连接样本存储
    let store = Arc::new(RedisSampleStore::new(&config.store_url)?);

    let source = Arc::new(InfoCommandSource::new(&config.servers)?);
    let filter = MetricFilter::new(config.metrics.clone());
    let recorder = RollupRecorder::new(store.clone(), config.key_prefix.clone());
    let trimmer = RetentionTrimmer::new(store, config.key_prefix.clone(), config.retention.policy());

    let service = Arc::new(MonitorService::new(
        source,
        recorder,
        trimmer,
        filter,
        config.servers.clone(),
        config.metrics.clone(),
        config.sample_interval_secs,
        config.retention_interval_secs,
    ));

    info!(
        servers = config.servers.len(),
        metrics = config.metrics.len(),
        "Monitor service initialized"
    );

    // 两个周期任务相互独立
    let sampling_handle = service.clone().start_sampling_task();
    let retention_handle = service.clone().start_retention_task();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    sampling_handle.shutdown().await;
    retention_handle.shutdown().await;

    Ok(())
}
