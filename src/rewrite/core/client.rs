//! 改写服务客户端
//!
//! `SegmentRewriter` 是核心与外部改写服务之间唯一的边界：一组有序片段进，一组有序片段出。
//! 片段数是否一致由调用器检查，客户端只负责传输和协议。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rewrite::config::{constants, RewriteConfig};
use crate::rewrite::error::helpers::protocol_error;
use crate::rewrite::error::{RewriteError, RewriteResult};

/// 外部改写服务
#[allow(async_fn_in_trait)]
pub trait SegmentRewriter {
    /// 改写一组片段
    ///
    /// `directive` 是整次改写共用的引导语，原样转发给服务。
    async fn rewrite_segments(
        &self,
        segments: &[String],
        directive: Option<&str>,
    ) -> RewriteResult<Vec<String>>;
}

impl<R: SegmentRewriter + ?Sized> SegmentRewriter for &R {
    async fn rewrite_segments(
        &self,
        segments: &[String],
        directive: Option<&str>,
    ) -> RewriteResult<Vec<String>> {
        (**self).rewrite_segments(segments, directive).await
    }
}

#[derive(Debug, Serialize)]
struct RewriteRequest<'a> {
    segments: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    opinion: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    segments: Option<Vec<Value>>,
}

/// 基于 HTTP/JSON 的改写服务客户端
///
/// 请求 `POST {api_url}`，请求体 `{"segments": [...], "opinion": "..."}`，
/// 期望响应 `{"segments": [...]}`。
#[derive(Debug, Clone)]
pub struct HttpRewriteClient {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRewriteClient {
    /// 创建客户端
    ///
    /// 请求超时由调用器统一控制，这里不再额外设置。
    pub fn new(api_url: impl Into<String>) -> RewriteResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("reprose/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RewriteError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// 按配置创建客户端
    pub fn from_config(config: &RewriteConfig) -> RewriteResult<Self> {
        Self::new(config.api_url.clone())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl SegmentRewriter for HttpRewriteClient {
    async fn rewrite_segments(
        &self,
        segments: &[String],
        directive: Option<&str>,
    ) -> RewriteResult<Vec<String>> {
        let request = RewriteRequest {
            segments,
            opinion: directive,
        };

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(constants::ERROR_BODY_PREVIEW_CHARS).collect();
            return Err(protocol_error(format!(
                "改写服务返回状态码 {}: {}",
                status.as_u16(),
                preview
            )));
        }

        let body = response.text().await?;
        let payload: RewriteResponse = serde_json::from_str(&body)
            .map_err(|e| protocol_error(format!("响应体不是有效JSON: {}", e)))?;

        let values = payload
            .segments
            .ok_or_else(|| protocol_error("响应缺少 segments 数组"))?;

        Ok(values.into_iter().map(value_to_segment).collect())
    }
}

fn value_to_segment(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
