//! 模型调用日志
//!
//! 每次模型调用生成一条结构化日志，通过 tracing 输出。
//! 只记录长度、耗时和脱敏信息，不落盘，也不记录想法或生成内容本身。

use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 调用模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    Streaming,
    Buffered,
}

impl InvocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationMode::Streaming => "streaming",
            InvocationMode::Buffered => "buffered",
        }
    }
}

/// 单次调用的日志记录
#[derive(Debug)]
pub struct RequestLog {
    /// 请求 ID
    pub request_id: String,
    pub mode: InvocationMode,
    pub model: String,
    pub prompt_length: usize,
    started: Instant,
}

impl RequestLog {
    /// 开始记录一次调用
    pub fn start(mode: InvocationMode, model: &str, prompt: &str) -> Self {
        let log = Self {
            request_id: generate_request_id(),
            mode,
            model: model.to_string(),
            prompt_length: prompt.chars().count(),
            started: Instant::now(),
        };

        info!(
            request_id = %log.request_id,
            mode = log.mode.as_str(),
            model = %log.model,
            prompt_length = log.prompt_length,
            "LLM request started"
        );
        log
    }

    /// 已耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// 调用成功
    pub fn success(&self, response_length: usize, chunk_count: usize) {
        info!(
            request_id = %self.request_id,
            mode = self.mode.as_str(),
            duration_ms = self.elapsed_ms(),
            response_length,
            chunk_count,
            "LLM request completed"
        );
    }

    /// 调用失败
    pub fn failure(&self, error_message: &str, chunk_count: usize) {
        error!(
            request_id = %self.request_id,
            mode = self.mode.as_str(),
            duration_ms = self.elapsed_ms(),
            chunk_count,
            error = %error_message,
            "LLM request failed"
        );
    }

    /// 客户端在流结束前断开
    pub fn cancelled(&self, chunk_count: usize) {
        warn!(
            request_id = %self.request_id,
            duration_ms = self.elapsed_ms(),
            chunk_count,
            "Client disconnected, upstream stream released"
        );
    }
}

/// 生成请求 ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// API 密钥脱敏
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
