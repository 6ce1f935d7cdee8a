//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{CompletionModel, GeminiClient, LlmError};
use crate::services::{IdeaRelay, PromptTemplate};

/// 应用共享状态
///
/// 启动时构建一次，之后只读；不持有任何跨请求的可变状态。
#[derive(Clone)]
pub struct AppState {
    /// 想法改写转发器
    pub relay: Arc<IdeaRelay>,
}

impl AppState {
    /// 使用给定模型创建状态
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            relay: Arc::new(IdeaRelay::new(model, PromptTemplate::improve_idea())),
        }
    }

    /// 根据配置创建 Gemini 客户端及状态
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }
}

/// 创建可共享的应用状态
pub fn create_shared_state(config: &AppConfig) -> Result<Arc<AppState>, LlmError> {
    Ok(Arc::new(AppState::from_config(config)?))
}
