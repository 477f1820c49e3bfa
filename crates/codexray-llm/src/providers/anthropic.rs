use crate::config::ProviderConfig;
use crate::error::{LlmError, Result};
use crate::http::send_json;
use crate::providers::{base_url, resolve_api_key};
use crate::types::{ChatRequest, ChatResponse, Usage};
use reqwest::Client;
use serde_json::Value;

const DEFAULT_VERSION: &str = "2023-06-01";

pub async fn chat(client: &Client, cfg: &ProviderConfig, req: ChatRequest) -> Result<ChatResponse> {
    let url = format!("{}/v1/messages", base_url(cfg)?);
    let key = resolve_api_key(cfg)?;

    let mut builder = client
        .post(url)
        .header("x-api-key", key)
        .header("anthropic-version", DEFAULT_VERSION)
        .json(&request_body(&req));
    for (k, v) in &cfg.extra_headers {
        builder = builder.header(k, v);
    }

    let resp = send_json::<Value>(builder).await?;
    let content = extract_text(&resp);
    if content.is_empty() && resp.get("content").is_none() {
        return Err(LlmError::Parse("response has no content blocks".into()));
    }
    Ok(ChatResponse {
        content,
        usage: parse_usage(&resp),
    })
}

fn request_body(req: &ChatRequest) -> Value {
    let mut body = serde_json::json!({
        "model": req.model,
        "messages": [{ "role": "user", "content": req.prompt }],
        "max_tokens": req.max_tokens.unwrap_or(1024),
    });
    if let Some(temp) = req.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    body
}

/// Text blocks joined in order; tool and other block types are skipped.
fn extract_text(resp: &Value) -> String {
    let Some(content) = resp.get("content").and_then(|v| v.as_array()) else {
        return String::new();
    };
    let mut out = String::new();
    for part in content {
        if part.get("type").and_then(|v| v.as_str()) == Some("text") {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                out.push_str(text);
            }
        }
    }
    out
}

fn parse_usage(resp: &Value) -> Usage {
    let Some(u) = resp.get("usage").and_then(|v| v.as_object()) else {
        return Usage::default();
    };
    let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).map(|v| v as u32);
    let prompt_tokens = field("input_tokens");
    let completion_tokens = field("output_tokens");
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens.zip(completion_tokens).map(|(a, b)| a + b),
    }
}
