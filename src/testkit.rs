//! 测试用的确定性模型替身与进程内模型服务

use async_stream::stream;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::llm::{ChunkStream, CompletionModel, LlmError};

/// 流被丢弃时置位
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// 按脚本输出的模型
///
/// - 依次产出 `chunks`
/// - 设置了 `failure` 时，流在 chunks 之后产出错误；单次调用直接返回错误
/// - `hang` 为 true 时，流在 chunks 之后永远挂起
pub struct ScriptedModel {
    chunks: Vec<String>,
    failure: Option<String>,
    hang: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    released: Arc<AtomicBool>,
}

impl ScriptedModel {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            failure: None,
            hang: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// 被调用次数（流式与单次合计）
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    /// 上一次创建的流是否已被释放
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// 替身抛出的错误（与调用方看到的消息一致）
    pub fn error_for(message: &str) -> LlmError {
        LlmError::ApiError {
            status: 500,
            message: message.to_string(),
        }
    }

    fn record(&self, prompt: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn stream(&self, prompt: String) -> ChunkStream {
        self.record(&prompt);
        self.released.store(false, Ordering::SeqCst);

        let chunks = self.chunks.clone();
        let failure = self.failure.clone();
        let hang = self.hang;
        let flag = ReleaseFlag(Arc::clone(&self.released));

        Box::pin(stream! {
            let _flag = flag;
            for chunk in chunks {
                yield Ok(chunk);
            }
            if let Some(message) = failure {
                yield Err(ScriptedModel::error_for(&message));
            } else if hang {
                futures::future::pending::<()>().await;
            }
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        self.record(&prompt);
        match &self.failure {
            Some(message) => Err(Self::error_for(message)),
            None => Ok(self.chunks.concat()),
        }
    }
}

/// 模型服务替身的一次应答
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl UpstreamReply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    /// 每个负载一条 `data:` 事件
    pub fn sse<S: AsRef<str>>(events: &[S]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: events
                .iter()
                .map(|e| format!("data: {}\r\n\r\n", e.as_ref()))
                .collect(),
        }
    }
}

/// 文本增量事件
pub fn text_event(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

/// 在 127.0.0.1 随机端口上运行的模型服务替身
///
/// 按顺序返回预设应答，最后一条应答会一直重复。
pub struct MockUpstream {
    replies: Mutex<VecDeque<UpstreamReply>>,
    attempts: AtomicUsize,
    api_keys: Mutex<Vec<String>>,
    uris: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
}

impl MockUpstream {
    /// 启动服务，返回 base_url 和替身句柄
    pub async fn spawn(replies: Vec<UpstreamReply>) -> (String, Arc<MockUpstream>) {
        let upstream = Arc::new(MockUpstream {
            replies: Mutex::new(replies.into()),
            attempts: AtomicUsize::new(0),
            api_keys: Mutex::new(Vec::new()),
            uris: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(reply)
            .with_state(Arc::clone(&upstream));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), upstream)
    }

    /// 收到的请求次数
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().clone()
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().clone()
    }

    fn next_reply(&self) -> Option<UpstreamReply> {
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }
}

async fn reply(
    State(upstream): State<Arc<MockUpstream>>,
    headers: HeaderMap,
    uri: Uri,
    body: String,
) -> Response {
    upstream.attempts.fetch_add(1, Ordering::SeqCst);
    if let Some(key) = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) {
        upstream.api_keys.lock().push(key.to_string());
    }
    upstream.uris.lock().push(uri.to_string());
    upstream
        .bodies
        .lock()
        .push(serde_json::from_str(&body).unwrap_or(Value::Null));

    match upstream.next_reply() {
        Some(r) => (
            StatusCode::from_u16(r.status).unwrap(),
            [(header::CONTENT_TYPE, r.content_type)],
            r.body,
        )
            .into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
