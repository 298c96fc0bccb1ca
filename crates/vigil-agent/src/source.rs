use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use vigil_types::ServerId;

/// 状态获取接口：向一台服务器索取一份原始状态文本
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, server: &ServerId) -> Result<String>;
}

/// 通过 INFO 命令获取状态
pub struct InfoCommandSource {
    clients: HashMap<ServerId, redis::Client>,
}

impl InfoCommandSource {
    pub fn new(servers: &[ServerId]) -> Result<Self> {
        let mut clients = HashMap::new();
        for server in servers {
            let url = format!("redis://{}:{}/", server.host, server.port);
            clients.insert(server.clone(), redis::Client::open(url)?);
        }
        Ok(Self { clients })
    }
}

#[async_trait]
impl StatusSource for InfoCommandSource {
    async fn fetch_status(&self, server: &ServerId) -> Result<String> {
        let client = self
            .clients
            .get(server)
            .ok_or_else(|| anyhow::anyhow!("unknown server: {}", server))?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let info: String = redis::cmd("INFO").query_async(&mut conn).await?;
        Ok(info)
    }
}
