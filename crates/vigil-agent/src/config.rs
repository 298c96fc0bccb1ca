use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use vigil_core::{RetentionPolicy, DEFAULT_KEY_PREFIX};
use vigil_types::ServerId;

/// 配置错误：启动阶段致命，任何任务开始前就失败
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no monitored servers configured")]
    NoServers,

    #[error("no tracked metrics configured")]
    NoMetrics,
}

/// 采集代理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 被监控的服务器列表
    #[serde(default)]
    pub servers: Vec<ServerId>,

    /// 跟踪的指标名（普通或复合 `<组>:<字段>`）
    #[serde(default)]
    pub metrics: Vec<String>,

    /// 存储键前缀（包含结尾分隔符）
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// 采样间隔（秒）
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// 保留裁剪间隔（秒）
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,

    /// 各分辨率最大保留条数
    #[serde(default)]
    pub retention: RetentionLimits,

    /// 样本存储地址
    #[serde(default = "default_store_url")]
    pub store_url: String,
}

/// 各分辨率的保留上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionLimits {
    #[serde(default = "default_max_raw")]
    pub max_raw: u64,

    #[serde(default = "default_max_hourly")]
    pub max_hourly: u64,

    #[serde(default = "default_max_daily")]
    pub max_daily: u64,
}

impl RetentionLimits {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_raw: self.max_raw,
            max_hourly: self.max_hourly,
            max_daily: self.max_daily,
        }
    }
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            max_raw: default_max_raw(),
            max_hourly: default_max_hourly(),
            max_daily: default_max_daily(),
        }
    }
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_sample_interval_secs() -> u64 {
    60
}

fn default_retention_interval_secs() -> u64 {
    300
}

fn default_max_raw() -> u64 {
    1440
}

fn default_max_hourly() -> u64 {
    168
}

fn default_max_daily() -> u64 {
    365
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

impl AgentConfig {
    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            metrics: Vec::new(),
            key_prefix: default_key_prefix(),
            sample_interval_secs: 60,
            retention_interval_secs: 300,
            retention: RetentionLimits::default(),
            store_url: default_store_url(),
        }
    }
}
