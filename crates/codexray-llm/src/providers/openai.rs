use crate::config::ProviderConfig;
use crate::error::{LlmError, Result};
use crate::http::send_json;
use crate::providers::{base_url, resolve_api_key};
use crate::types::{ChatRequest, ChatResponse, Usage};
use reqwest::Client;
use serde_json::Value;

pub async fn chat(client: &Client, cfg: &ProviderConfig, req: ChatRequest) -> Result<ChatResponse> {
    let url = format!("{}/chat/completions", base_url(cfg)?);
    let key = resolve_api_key(cfg)?;

    let mut builder = client.post(url).bearer_auth(key).json(&request_body(&req));
    for (k, v) in &cfg.extra_headers {
        builder = builder.header(k, v);
    }

    let resp = send_json::<Value>(builder).await?;
    let content = extract_text(&resp)
        .ok_or_else(|| LlmError::Parse("response has no choices[0].message.content".into()))?;
    Ok(ChatResponse {
        content,
        usage: parse_usage(&resp),
    })
}

fn request_body(req: &ChatRequest) -> Value {
    let mut body = serde_json::json!({
        "model": req.model,
        "messages": [{ "role": "user", "content": req.prompt }],
    });
    if let Some(temp) = req.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    if let Some(max_tokens) = req.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

fn extract_text(resp: &Value) -> Option<String> {
    resp.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn parse_usage(resp: &Value) -> Usage {
    let Some(u) = resp.get("usage") else {
        return Usage::default();
    };
    let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).map(|v| v as u32);
    Usage {
        prompt_tokens: field("prompt_tokens"),
        completion_tokens: field("completion_tokens"),
        total_tokens: field("total_tokens"),
    }
}
