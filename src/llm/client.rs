//! Gemini 聊天补全客户端

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::format::build_gemini_endpoint;
use super::gemini::{generate_gemini, stream_gemini, RetryPolicy};
use super::types::{ChunkStream, CompletionModel, GenerateContentRequest, LlmError};
use crate::config::AppConfig;

/// Gemini 客户端
///
/// 进程启动时创建一次，之后只读共享。
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// 根据配置创建客户端
    ///
    /// 只有配置了 `timeout_secs` 时才设置请求超时。
    pub fn new(config: &AppConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::ConfigError("API Key is required".to_string()));
        }

        let mut builder = Client::builder().pool_max_idle_per_host(5);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(LlmError::HttpError)?;

        info!(
            "Gemini client ready: model={}, temperature={}, max_retries={}, timeout={:?}",
            config.model,
            config.temperature,
            config.max_retries,
            config.timeout()
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    fn payload(&self, prompt: String) -> GenerateContentRequest {
        GenerateContentRequest::single_prompt(prompt, self.temperature)
    }
}

#[async_trait]
impl CompletionModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn stream(&self, prompt: String) -> ChunkStream {
        stream_gemini(
            self.client.clone(),
            build_gemini_endpoint(&self.base_url, &self.model, true),
            self.api_key.clone(),
            self.payload(prompt),
            self.retry,
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        let endpoint = build_gemini_endpoint(&self.base_url, &self.model, false);
        generate_gemini(
            &self.client,
            &endpoint,
            &self.api_key,
            &self.payload(prompt),
            self.retry,
        )
        .await
    }
}
