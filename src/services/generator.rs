//! 生成能力接口
//!
//! 把 (system_prompt, user_message) 变成结构化的 JSON。
//! 阶段逻辑只依赖这个 trait，具体实现在构造时选定。

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

use crate::error::{AppResult, LlmError};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_message: &str) -> AppResult<JsonValue>;
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// 从模型回复中解析 JSON
///
/// 依次尝试：整段文本、```json 代码块、第一个 `{` 到最后一个 `}` 之间的内容
pub fn parse_json_reply(response: &str) -> AppResult<JsonValue> {
    let trimmed = response.trim();

    let first_err = match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(body) = fence_regex().captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str(body.as_str()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::JsonParseFailed {
        response: crate::utils::truncate_text(trimmed, 200),
        source: first_err,
    }
    .into())
}
