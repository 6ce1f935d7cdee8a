//! 想法改写端点
//!
//! - `POST /improve`：流式返回纯文本
//! - `POST /improve/buffered`：完整生成后返回 JSON

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppResult;
use crate::models::IdeaRequest;
use crate::state::AppState;

/// 禁止中间层缓存和缓冲的响应头
fn no_buffering_headers() -> [(HeaderName, &'static str); 2] {
    [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ]
}

/// 流式改写
///
/// 请求体校验失败时返回 422，此时不会调用模型。
async fn improve_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdeaRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    debug!("Streaming improvement requested: idea_length={}", req.idea.len());

    let stream = state
        .relay
        .stream_improvement(&req.idea)
        .map(Ok::<_, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        no_buffering_headers(),
        Body::from_stream(stream),
    )
        .into_response())
}

/// 缓冲改写
async fn improve_buffered(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdeaRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    debug!("Buffered improvement requested: idea_length={}", req.idea.len());

    let improved = state.relay.improve(&req.idea).await?;
    Ok((no_buffering_headers(), Json(improved)).into_response())
}

/// 创建改写路由
pub fn improve_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/improve", post(improve_stream))
        .route("/improve/buffered", post(improve_buffered))
}
