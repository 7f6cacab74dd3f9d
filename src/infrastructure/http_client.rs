//! HTTP 客户端 - 基础设施层
//!
//! 持有唯一的 `reqwest::Client`，只暴露"发请求"的能力

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::utils::logging::truncate_text;

/// API 客户端
///
/// 职责：
/// - 拼接请求地址
/// - JSON 编解码
/// - 统一拦截错误：没有响应 → `Transport`，非 2xx → `Rejected`
/// - 不认识任何业务资源
///
/// 内部的 `reqwest::Client` 使用 Arc，clone 开销很小
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(&config.api_base_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 拼接完整地址，`path` 以 `/` 开头
    pub fn url(&self, path: &str) -> Result<Url> {
        let full = format!("{}{}", self.base_url, path);
        Url::parse(&full).map_err(|e| ClientError::InvalidUrl {
            url: full,
            message: e.to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.send_json(self.http.request(Method::GET, url.clone()), &url).await
    }

    /// 带查询参数的 GET
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self.http.request(Method::GET, url.clone()).query(query);
        self.send_json(request, &url).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self.http.request(Method::POST, url.clone()).json(body);
        self.send_json(request, &url).await
    }

    /// 无请求体的 POST（重试、提交 AI 任务等动作型接口）
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.send_json(self.http.request(Method::POST, url.clone()), &url).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self.http.request(Method::PUT, url.clone()).json(body);
        self.send_json(request, &url).await
    }

    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.send_json(self.http.request(Method::PUT, url.clone()), &url).await
    }

    /// DELETE，成功时不关心响应体（后端返回 204）
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        self.send_raw(self.http.request(Method::DELETE, url.clone()), &url)
            .await
            .map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &Url) -> Result<T> {
        let body = self.send_raw(request, url).await?;
        // 空响应体按 null 处理，方便 `()` / `Option<T>` 接收
        let bytes: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(bytes).map_err(|source| {
            warn!(
                "响应解析失败: {} → {}",
                url,
                truncate_text(&String::from_utf8_lossy(&body), 200)
            );
            ClientError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }

    /// 统一的请求发送与错误拦截
    async fn send_raw(&self, request: RequestBuilder, url: &Url) -> Result<Vec<u8>> {
        debug!("→ {}", url);

        let response = request.send().await.map_err(|source| {
            warn!("网络请求失败: {} ({})", url, source);
            ClientError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        if !status.is_success() {
            let message = extract_error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "未知错误".to_string());
            warn!("请求被拒绝: {} (HTTP {}): {}", url, status.as_u16(), message);
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("← {} (HTTP {}, {} 字节)", url, status.as_u16(), body.len());
        Ok(body)
    }
}

/// 从错误响应体中提取服务端消息
///
/// 支持 `{"detail": "..."}`、`{"detail": [{"msg": "..."}]}` 和 `{"message": "..."}`，
/// 都不匹配时返回非空的原始文本
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<JsonValue>(body) {
        match value.get("detail") {
            Some(JsonValue::String(s)) => return Some(s.clone()),
            Some(JsonValue::Array(items)) => {
                let msgs: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(str::to_string)
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            _ => {}
        }
        if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
            return Some(msg.to_string());
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(truncate_text(&text, 200))
    }
}
