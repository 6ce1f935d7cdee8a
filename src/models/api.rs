//! REST API 请求/响应模型

use serde::{Deserialize, Serialize};

/// 想法改写请求
#[derive(Debug, Clone, Deserialize)]
pub struct IdeaRequest {
    /// 用户提交的网站想法（不做长度或内容校验）
    pub idea: String,
}

/// 想法改写结果（缓冲模式）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImprovedIdea {
    pub improved_content: String,
}

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
