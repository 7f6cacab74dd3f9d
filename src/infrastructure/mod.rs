//! 基础设施层
//!
//! 持有唯一的 HTTP 连接池，只暴露"发请求、拿 JSON"的能力

pub mod http_client;

pub use http_client::{extract_error_message, ApiClient};
