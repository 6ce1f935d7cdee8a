//! 统一错误处理模块
//!
//! 定义应用级错误类型，并实现 axum 的 IntoResponse trait 以便自动转换为 HTTP 响应。

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm::LlmError;

/// 应用错误枚举
#[derive(Error, Debug)]
pub enum AppError {
    /// 启动配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 请求体校验错误
    #[error("请求校验失败: {0}")]
    Validation(String),

    /// 上游模型调用错误
    #[error("模型调用失败: {0}")]
    Upstream(String),
}

impl AppError {
    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_) | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给调用方的消息（不带前缀）
    pub fn detail(&self) -> &str {
        match self {
            AppError::Config(msg) | AppError::Validation(msg) | AppError::Upstream(msg) => msg,
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "detail": self.detail()
        }));

        (status, body).into_response()
    }
}

/// 便捷类型别名
pub type AppResult<T> = Result<T, AppError>;
