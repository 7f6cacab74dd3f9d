//! 错误类型
//!
//! 库层统一使用 [`ClientError`] / [`ConfigError`]，应用层（`app` / `main`）使用 `anyhow`。
//!
//! 分析任务的四类失败在这里落地为两类：
//! - 传输失败 / 服务端拒绝 → [`ClientError::Transport`] / [`ClientError::Rejected`]
//! - 任务自身失败 / 客户端超时 → `services::polling::PollFailure`

use std::path::PathBuf;

/// 库层 Result 别名
pub type Result<T> = std::result::Result<T, ClientError>;

/// API 客户端错误
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 没有收到响应（连接失败、超时、DNS 等）
    #[error("网络请求失败 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 服务端返回非 2xx 状态码
    #[error("服务端拒绝请求 (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// 响应体无法解析
    #[error("响应解析失败 ({url}): {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// 无法拼接出合法的请求地址
    #[error("无效的请求地址 '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// 请求在发出前被客户端校验拦截
    #[error("参数校验失败: {0}")]
    Validation(String),
}

impl ClientError {
    /// 服务端返回的 HTTP 状态码（仅 `Rejected` 有）
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// 是否是"没有收到响应"类的错误
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析配置文件 {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("配置无效: {0}")]
    Invalid(String),
}
