use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

use vigil_agent::service::MonitorService;
use vigil_agent::source::StatusSource;
use vigil_core::{MetricFilter, RetentionPolicy, RetentionTrimmer, RollupRecorder};
use vigil_store::{MemorySampleStore, SampleStore};
use vigil_types::{Bucket, ServerId};

/// 固定状态文本的测试源；端口 9999 模拟失联服务器
struct FixedSource {
    blob: String,
}

#[async_trait]
impl StatusSource for FixedSource {
    async fn fetch_status(&self, server: &ServerId) -> Result<String> {
        if server.port == 9999 {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.blob.clone())
    }
}

fn build_service(
    store: Arc<MemorySampleStore>,
    blob: &str,
    servers: Vec<ServerId>,
    metrics: Vec<String>,
) -> Arc<MonitorService> {
    let source = Arc::new(FixedSource {
        blob: blob.to_string(),
    });
    let filter = MetricFilter::new(metrics.clone());
    let recorder = RollupRecorder::new(store.clone(), "status:".to_string());
    let trimmer = RetentionTrimmer::new(
        store,
        "status:".to_string(),
        RetentionPolicy {
            max_raw: 3,
            max_hourly: 2,
            max_daily: 2,
        },
    );

    Arc::new(MonitorService::new(
        source, recorder, trimmer, filter, servers, metrics, 1, 1,
    ))
}

#[tokio::test]
async fn test_sampling_pipeline_end_to_end() {
    let store = Arc::new(MemorySampleStore::new());
    let server = ServerId::new("127.0.0.1".to_string(), 6379);
    let service = build_service(
        store.clone(),
        "used_memory:100\r\nuptime_in_seconds:500\r\n",
        vec![server],
        vec!["used_memory".to_string()],
    );

    service.sample_all().await;

    // 只有跟踪的指标被写入
    let raw = store
        .range_by_score("status:127.0.0.1:6379:used_memory", i64::MIN, i64::MAX)
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);
    assert!(raw[0].contains(":\"100\""));

    let untracked = store
        .cardinality("status:127.0.0.1:6379:uptime_in_seconds")
        .await
        .unwrap();
    assert_eq!(untracked, 0);

    let hourly = store
        .range_by_score(
            "status:127.0.0.1:6379:hourly:used_memory",
            i64::MIN,
            i64::MAX,
        )
        .await
        .unwrap();
    let bucket: Bucket = serde_json::from_str(&hourly[0]).unwrap();
    assert_eq!(bucket, Bucket { mean: 100.0, n: 1 });
}

#[tokio::test]
async fn test_compound_metric_pipeline() {
    let store = Arc::new(MemorySampleStore::new());
    let server = ServerId::new("127.0.0.1".to_string(), 6379);
    let service = build_service(
        store.clone(),
        "db0:keys=37,expires=2\r\n",
        vec![server],
        vec!["db0:keys".to_string()],
    );

    service.sample_all().await;

    let raw = store
        .range_by_score("status:127.0.0.1:6379:db0:keys", i64::MIN, i64::MAX)
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);
    assert!(raw[0].contains(":\"37\""));
}

#[tokio::test]
async fn test_unreachable_server_does_not_block_others() {
    let store = Arc::new(MemorySampleStore::new());
    let healthy = ServerId::new("127.0.0.1".to_string(), 6379);
    let unreachable = ServerId::new("127.0.0.1".to_string(), 9999);
    let service = build_service(
        store.clone(),
        "used_memory:100\r\n",
        vec![unreachable, healthy],
        vec!["used_memory".to_string()],
    );

    service.sample_all().await;

    // 失联服务器本轮被跳过，健康服务器照常写入
    assert_eq!(
        store
            .cardinality("status:127.0.0.1:6379:used_memory")
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store
            .cardinality("status:127.0.0.1:9999:used_memory")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_repeated_sampling_accumulates_bucket() {
    let store = Arc::new(MemorySampleStore::new());
    let server = ServerId::new("127.0.0.1".to_string(), 6379);
    let service = build_service(
        store.clone(),
        "used_memory:100\r\n",
        vec![server],
        vec!["used_memory".to_string()],
    );

    service.sample_all().await;
    service.sample_all().await;
    service.sample_all().await;

    let hourly = store
        .range_by_score(
            "status:127.0.0.1:6379:hourly:used_memory",
            i64::MIN,
            i64::MAX,
        )
        .await
        .unwrap();
    assert_eq!(hourly.len(), 1);

    let bucket: Bucket = serde_json::from_str(&hourly[0]).unwrap();
    assert_eq!(bucket.n, 3);
    assert!((bucket.mean - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_task_handles_shut_down_cleanly() {
    let store = Arc::new(MemorySampleStore::new());
    let server = ServerId::new("127.0.0.1".to_string(), 6379);
    let service = build_service(
        store.clone(),
        "used_memory:100\r\n",
        vec![server],
        vec!["used_memory".to_string()],
    );

    let sampling = service.clone().start_sampling_task();
    let retention = service.clone().start_retention_task();

    // interval 的第一个 tick 立即触发，等它完成
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    sampling.shutdown().await;
    retention.shutdown().await;

    assert!(
        store
            .cardinality("status:127.0.0.1:6379:used_memory")
            .await
            .unwrap()
            >= 1
    );
}
