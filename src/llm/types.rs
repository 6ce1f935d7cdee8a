//! LLM 类型定义

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// 模型输出的文本增量流
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// 聊天补全模型
///
/// 转发层只依赖这个 trait，测试时注入确定性的替身实现。
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// 模型标识
    fn model_name(&self) -> &str;

    /// 流式补全：按到达顺序产出文本增量
    fn stream(&self, prompt: String) -> ChunkStream;

    /// 单次补全：等待完整输出
    async fn complete(&self, prompt: String) -> Result<String, LlmError>;
}

/// 对话内容（Gemini `contents` 元素）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// 角色：user, model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.into()),
                thought: None,
            }],
        }
    }
}

/// 内容片段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 思考过程片段（不转发给调用方）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// 生成参数
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// 请求载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// 单条用户消息的请求
    pub fn single_prompt(prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                temperature: Some(temperature),
            },
        }
    }
}

/// 响应（流式与非流式共用同一结构）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Candidate {
    /// 因安全策略等原因被截断的结束原因
    pub fn blocked_reason(&self) -> Option<&str> {
        match self.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
                Some(reason)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// 提取第一个候选的可见文本
    ///
    /// 提示词被拦截，或候选因安全策略结束且没有任何文本时，返回 `Blocked` 错误。
    pub fn text(&self) -> Result<String, LlmError> {
        if self.candidates.is_empty() {
            if let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
            {
                return Err(LlmError::Blocked(reason));
            }
        }

        let text = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = self.candidates.first().and_then(|c| c.blocked_reason()) {
                return Err(LlmError::Blocked(reason.to_string()));
            }
        }

        Ok(text)
    }
}

/// 上游错误响应体
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

/// LLM 错误类型
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP 请求错误
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API 返回错误
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// 提示词或输出被模型服务拦截
    #[error("blocked by provider: {0}")]
    Blocked(String),

    /// 模型没有返回任何内容
    #[error("model returned no content")]
    EmptyResponse,

    /// 配置错误
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// JSON 解析错误
    #[error("failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LlmError {
    /// 是否为可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::HttpError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            LlmError::ApiError { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }
}
