//! Gemini Generative Language API 实现（流式与单次）

use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::format::extract_error_message;
use super::types::{ChunkStream, GenerateContentRequest, GenerateContentResponse, LlmError};

/// 重试策略
///
/// 只在建立调用阶段（尚未产出任何增量）对瞬时错误重试。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }

    /// 第 `attempt` 次重试前的等待时间（从 1 开始，指数退避）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// 发送一次请求并检查状态码
async fn send_once(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    payload: &GenerateContentRequest,
) -> Result<Response, LlmError> {
    let response = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Gemini API error: status={}, body={}",
            status_code,
            error_text.chars().take(500).collect::<String>()
        );
        return Err(LlmError::ApiError {
            status: status_code,
            message: extract_error_message(&error_text),
        });
    }

    Ok(response)
}

/// 带重试的请求发送
async fn send_with_retry(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    payload: &GenerateContentRequest,
    retry: RetryPolicy,
) -> Result<Response, LlmError> {
    let mut attempt = 0;
    loop {
        match send_once(client, endpoint, api_key, payload).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry.backoff(attempt);
                warn!(
                    "Gemini request failed ({}), retry {}/{} in {:?}",
                    e, attempt, retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// SSE 行解码器
///
/// 按字节缓冲，完整行才解码，避免多字节字符被网络分块截断。
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// 写入新字节，返回已完整的 `data:` 负载
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = Self::data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// 流结束时处理没有换行结尾的最后一行
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        Self::data_of(&rest)
    }

    fn data_of(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        let data = line.strip_prefix("data:")?.trim_start();
        if data.is_empty() || data == "[DONE]" {
            return None;
        }
        Some(data.to_string())
    }
}

/// 解析一条 SSE 负载，返回其中的文本增量
///
/// 无法解析的负载视为上游错误，由转发层追加错误标记。
fn parse_event(data: &str) -> Result<Option<String>, LlmError> {
    let event: GenerateContentResponse = serde_json::from_str(data).map_err(|e| {
        error!(
            "Failed to parse Gemini event: {}, data: {}",
            e,
            data.chars().take(200).collect::<String>()
        );
        LlmError::JsonError(e)
    })?;

    let text = event.text()?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// 流式调用 Gemini API
pub fn stream_gemini(
    client: Client,
    endpoint: String,
    api_key: String,
    payload: GenerateContentRequest,
    retry: RetryPolicy,
) -> ChunkStream {
    Box::pin(try_stream! {
        debug!("Gemini streaming request: endpoint={}", endpoint);

        let response = send_with_retry(&client, &endpoint, &api_key, &payload, retry).await?;

        let mut decoder = SseDecoder::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let bytes = chunk_result?;
            for data in decoder.push(&bytes) {
                if let Some(text) = parse_event(&data)? {
                    yield text;
                }
            }
        }

        if let Some(data) = decoder.finish() {
            if let Some(text) = parse_event(&data)? {
                yield text;
            }
        }
    })
}

/// 单次调用 Gemini API
pub async fn generate_gemini(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    payload: &GenerateContentRequest,
    retry: RetryPolicy,
) -> Result<String, LlmError> {
    debug!("Gemini request: endpoint={}", endpoint);

    let response = send_with_retry(client, endpoint, api_key, payload, retry).await?;
    let body: GenerateContentResponse = response.json().await?;

    let text = body.text()?;
    if body.candidates.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}
