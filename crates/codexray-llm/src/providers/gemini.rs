use crate::config::ProviderConfig;
use crate::error::{LlmError, Result};
use crate::http::send_json;
use crate::providers::{base_url, resolve_api_key};
use crate::types::{ChatRequest, ChatResponse, Usage};
use reqwest::Client;
use serde_json::Value;

pub async fn chat(client: &Client, cfg: &ProviderConfig, req: ChatRequest) -> Result<ChatResponse> {
    let key = resolve_api_key(cfg)?;
    let url = format!("{}/models/{}:generateContent", base_url(cfg)?, req.model);

    let mut builder = client
        .post(url)
        .header("x-goog-api-key", key)
        .json(&request_body(&req));
    for (k, v) in &cfg.extra_headers {
        builder = builder.header(k, v);
    }

    let resp = send_json::<Value>(builder).await?;
    let content = extract_text(&resp).ok_or_else(|| {
        LlmError::Parse("response has no candidates[0].content.parts text".into())
    })?;
    Ok(ChatResponse {
        content,
        usage: parse_usage(&resp),
    })
}

fn request_body(req: &ChatRequest) -> Value {
    let mut generation = serde_json::Map::new();
    if let Some(temp) = req.temperature {
        generation.insert("temperature".into(), serde_json::json!(temp));
    }
    if let Some(max_tokens) = req.max_tokens {
        generation.insert("maxOutputTokens".into(), serde_json::json!(max_tokens));
    }
    let mut body = serde_json::json!({
        "contents": [{ "role": "user", "parts": [{ "text": req.prompt }] }],
    });
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }
    body
}

/// Concatenates the text parts of the first candidate.
fn extract_text(resp: &Value) -> Option<String> {
    let parts = resp
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Some(text)
}

fn parse_usage(resp: &Value) -> Usage {
    let Some(u) = resp.get("usageMetadata") else {
        return Usage::default();
    };
    let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).map(|v| v as u32);
    Usage {
        prompt_tokens: field("promptTokenCount"),
        completion_tokens: field("candidatesTokenCount"),
        total_tokens: field("totalTokenCount"),
    }
}
