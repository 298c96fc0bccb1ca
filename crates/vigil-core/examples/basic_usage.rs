use std::sync::Arc;

use chrono::Utc;
use vigil_core::{
    expand_fields, parse_status, series_key, MetricFilter, RetentionPolicy, RetentionTrimmer,
    RollupRecorder, DEFAULT_KEY_PREFIX,
};
use vigil_store::{MemorySampleStore, SampleStore};
use vigil_types::{Resolution, ServerId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("📡 VIGIL Core Basic Usage Example\n");

    let store = Arc::new(MemorySampleStore::new());
    let server = ServerId::new("127.0.0.1".to_string(), 6379);

    // 1. 解析一份状态文本
    let blob = "# Memory\r\nused_memory:1048576\r\nconnected_clients:12\r\ndb0:keys=37,expires=2,avg_ttl=20648\r\n";
    let pairs = expand_fields(parse_status(blob));
    println!("🔍 Parsed {} metric pairs", pairs.len());

    // 2. 过滤出跟踪的指标
    let filter = MetricFilter::new(vec![
        "used_memory".to_string(),
        "connected_clients".to_string(),
        "db0:keys".to_string(),
    ]);
    let samples = filter.select(&server, pairs, Utc::now());
    println!("✅ Selected {} tracked samples\n", samples.len());

    // 3. 写入原始序列和聚合桶
    let recorder = RollupRecorder::new(store.clone(), DEFAULT_KEY_PREFIX.to_string());
    for sample in &samples {
        recorder.record(sample).await;
    }
    println!("💾 Samples recorded");

    for resolution in Resolution::ALL {
        let key = series_key(DEFAULT_KEY_PREFIX, &server, resolution, "used_memory");
        let count = store.cardinality(&key).await?;
        println!("  {} -> {} entries", key, count);
    }

    // 4. 执行一次保留裁剪
    let trimmer = RetentionTrimmer::new(
        store.clone(),
        DEFAULT_KEY_PREFIX.to_string(),
        RetentionPolicy::default(),
    );
    let stats = trimmer
        .trim_all(
            &[server],
            &["used_memory".to_string(), "connected_clients".to_string()],
        )
        .await;
    println!(
        "\n🧹 Retention pass: {} series examined, {} entries removed",
        stats.series_examined, stats.entries_removed
    );

    Ok(())
}
