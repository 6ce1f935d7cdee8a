//! LLM 模块
//!
//! 提供 Gemini 聊天补全客户端，以及转发层依赖的 `CompletionModel` 抽象。

mod client;
mod format;
mod gemini;
mod types;

pub use client::GeminiClient;
pub use types::*;
