use vigil_types::{Resolution, ServerId};

/// 默认键前缀（包含结尾分隔符）
pub const DEFAULT_KEY_PREFIX: &str = "status:";

/// 推导一个 (服务器, 指标, 分辨率) 组合的存储键。
/// 纯函数：同样的输入在任何进程、任何时刻都产生同样的键
pub fn series_key(prefix: &str, server: &ServerId, resolution: Resolution, metric: &str) -> String {
    match resolution.key_segment() {
        Some(segment) => format!(
            "{}{}:{}:{}:{}",
            prefix, server.host, server.port, segment, metric
        ),
        None => format!("{}{}:{}:{}", prefix, server.host, server.port, metric),
    }
}
