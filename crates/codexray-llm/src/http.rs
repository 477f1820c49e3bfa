use crate::error::{LlmError, Result};
use serde_json::Value;

/// Sends a JSON request once and parses the body.
///
/// Non-2xx responses become [`LlmError::Status`] carrying the upstream's own
/// error message when one can be found.
pub async fn send_json<T: serde::de::DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();

    if !status.is_success() {
        let text = resp.text().await?;
        return Err(LlmError::Status {
            status: status.as_u16(),
            message: upstream_message(&text),
        });
    }

    resp.json()
        .await
        .map_err(|e| LlmError::Parse(e.to_string()))
}

/// `error.message`, then top-level `message`, then the first 20 lines of the
/// raw body.
pub fn upstream_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let nested = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str());
        let top = value.get("message").and_then(|m| m.as_str());
        if let Some(message) = nested.or(top) {
            return message.to_string();
        }
    }
    body.lines().take(20).collect::<Vec<_>>().join("\n")
}
