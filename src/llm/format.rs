//! URL 构建与上游错误解析工具

use super::types::ApiErrorBody;

/// 修复 base_url
///
/// - 移除末尾斜杠
/// - 修复双斜杠（保留协议部分）
pub fn fix_base_url(base_url: &str) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();

    // 修复双斜杠（跳过协议部分）
    if let Some(pos) = url.find("://") {
        let (protocol, rest) = url.split_at(pos + 3);
        let fixed_rest = rest.replace("//", "/");
        url = format!("{}{}", protocol, fixed_rest);
    }

    url
}

/// 构建 Gemini 生成端点
///
/// 流式端点附带 `alt=sse`，以 SSE `data:` 行返回增量。
pub fn build_gemini_endpoint(base_url: &str, model: &str, stream: bool) -> String {
    let mut url = fix_base_url(base_url);

    if !url.ends_with("/v1beta") && !url.ends_with("/v1") {
        url.push_str("/v1beta");
    }

    let model = model.trim_start_matches("models/");
    if stream {
        format!("{}/models/{}:streamGenerateContent?alt=sse", url, model)
    } else {
        format!("{}/models/{}:generateContent", url, model)
    }
}

/// 从上游错误响应体中提取可读消息
///
/// 无法解析时原样返回（截断到 500 字符）。
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.chars().take(500).collect(),
    }
}
