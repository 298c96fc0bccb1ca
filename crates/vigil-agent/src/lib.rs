pub mod config;
pub mod service;
pub mod source;

pub use config::{AgentConfig, ConfigError, RetentionLimits};
pub use service::{MonitorService, TaskHandle};
pub use source::{InfoCommandSource, StatusSource};
