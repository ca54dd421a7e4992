//! 服务端配置

use std::env;

/// 默认监听地址
const DEFAULT_HOST: &str = "0.0.0.0";

/// 默认监听端口
const DEFAULT_PORT: u16 = 9601;

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// 从环境变量读取（DOMINO_HOST / DOMINO_PORT），未设置用默认值
    pub fn from_env() -> Self {
        let host = env::var("DOMINO_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("DOMINO_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { host, port }
    }

    /// 监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}
