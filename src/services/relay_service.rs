//! 想法改写转发服务
//!
//! 校验后的想法 -> 代入模板 -> 调用模型 -> 把输出交给 HTTP 层。
//! 流式与缓冲两种模式共用同一份模板和模型客户端。

use async_stream::stream;
use futures::{Stream, StreamExt};
use std::sync::Arc;

use super::prompt_service::PromptTemplate;
use crate::error::AppResult;
use crate::llm::CompletionModel;
use crate::models::ImprovedIdea;
use crate::utils::{InvocationMode, RequestLog};

/// 流式输出失败时追加的错误标记
pub fn error_marker(message: &str) -> String {
    format!("\n\nError: {}", message)
}

/// 流式请求的终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Complete,
    CompleteWithErrorSuffix,
}

/// 流式请求的作用域守卫
///
/// 无论正常结束、出错还是客户端断开，守卫都会随生成器一起被丢弃；
/// 仍处于 `Streaming` 时说明调用方提前断开。
struct StreamGuard {
    log: RequestLog,
    state: StreamState,
    chunk_count: usize,
    response_length: usize,
}

impl StreamGuard {
    fn new(log: RequestLog) -> Self {
        Self {
            log,
            state: StreamState::Streaming,
            chunk_count: 0,
            response_length: 0,
        }
    }

    fn chunk(&mut self, text: &str) {
        self.chunk_count += 1;
        self.response_length += text.len();
    }

    fn complete(&mut self) {
        self.state = StreamState::Complete;
        self.log.success(self.response_length, self.chunk_count);
    }

    fn fail(&mut self, message: &str) {
        self.state = StreamState::CompleteWithErrorSuffix;
        self.log.failure(message, self.chunk_count);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.state == StreamState::Streaming {
            self.log.cancelled(self.chunk_count);
        }
    }
}

/// 想法改写转发器
///
/// 启动时构建一次，在请求之间只读共享。
pub struct IdeaRelay {
    model: Arc<dyn CompletionModel>,
    template: PromptTemplate,
}

impl IdeaRelay {
    pub fn new(model: Arc<dyn CompletionModel>, template: PromptTemplate) -> Self {
        Self { model, template }
    }

    /// 构建发给模型的完整指令
    pub fn compose(&self, idea: &str) -> String {
        self.template.render(idea)
    }

    /// 流式改写
    ///
    /// 增量按到达顺序原样转发。上游出错时追加错误标记后结束，
    /// 流本身不会失败（此时状态行和响应头已经发出）。
    pub fn stream_improvement(&self, idea: &str) -> impl Stream<Item = String> + Send + 'static {
        let prompt = self.compose(idea);
        let model = Arc::clone(&self.model);

        stream! {
            let mut guard = StreamGuard::new(RequestLog::start(
                InvocationMode::Streaming,
                model.model_name(),
                &prompt,
            ));
            let mut upstream = model.stream(prompt);

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(text) => {
                        guard.chunk(&text);
                        yield text;
                    }
                    Err(e) => {
                        let message = e.to_string();
                        guard.fail(&message);
                        yield error_marker(&message);
                        return;
                    }
                }
            }

            guard.complete();
        }
    }

    /// 缓冲改写：等待完整输出后一次返回
    pub async fn improve(&self, idea: &str) -> AppResult<ImprovedIdea> {
        let prompt = self.compose(idea);
        let log = RequestLog::start(InvocationMode::Buffered, self.model.model_name(), &prompt);

        match self.model.complete(prompt).await {
            Ok(content) => {
                log.success(content.len(), 1);
                Ok(ImprovedIdea {
                    improved_content: content,
                })
            }
            Err(e) => {
                log.failure(&e.to_string(), 0);
                Err(e.into())
            }
        }
    }
}
