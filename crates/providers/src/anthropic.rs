//! Anthropic-native transport.
//!
//! Speaks the Messages API: system instructions go in a top-level `system`
//! field (sent as an array of text segments, preserving block order), and
//! the assistant prefill is forwarded as a seeded assistant turn so the model
//! continues the JSON object instead of restarting it.

use crate::traits::{CompletionTransport, ProviderRequest, RawCompletion, StopReason};
use crate::util::{classify_status, from_reqwest};
use cl_domain::config::{Config, ProviderId};
use cl_domain::error::{Error, Result};
use serde_json::Value;
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Transport adapter for the Anthropic Messages API.
pub struct AnthropicTransport {
    base_url: String,
    api_key: String,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl AnthropicTransport {
    /// Create the transport from process config. The credential is resolved
    /// eagerly; a placeholder key fails here, not on first use.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = crate::resolver::credential(cfg, ProviderId::Anthropic)?;
        let timeout_ms = cfg.completion.timeout_ms;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| from_reqwest(ProviderId::Anthropic, timeout_ms, e))?;

        Ok(Self {
            base_url: cfg
                .base_url(ProviderId::Anthropic)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            timeout_ms,
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the Messages API request body. Pure, so the wire shape is testable
/// without a network.
fn build_messages_body(req: &ProviderRequest) -> Value {
    let system: Vec<Value> = req
        .system_blocks
        .iter()
        .map(|block| serde_json::json!({"type": "text", "text": block}))
        .collect();

    let mut messages = vec![serde_json::json!({
        "role": "user",
        "content": req.user_prompt,
    })];
    if !req.assistant_prefill.is_empty() {
        messages.push(serde_json::json!({
            "role": "assistant",
            "content": req.assistant_prefill,
        }));
    }

    let mut body = serde_json::json!({
        "model": req.model,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
        "messages": messages,
    });
    if !system.is_empty() {
        body["system"] = Value::Array(system);
    }
    body
}

fn parse_stop_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("end_turn") | Some("stop_sequence") => StopReason::Stop,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::Other,
    }
}

fn parse_messages_response(body: &Value, latency_ms: u64) -> Result<RawCompletion> {
    let content = body
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::Http("anthropic: response missing 'content' array".into()))?;

    let mut text = String::new();
    for block in content {
        if block.get("type").and_then(|v| v.as_str()) == Some("text") {
            if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                text.push_str(t);
            }
        }
    }

    let stop_reason = parse_stop_reason(body.get("stop_reason").and_then(|v| v.as_str()));
    let content_length = text.len();

    Ok(RawCompletion {
        text,
        stop_reason,
        latency_ms,
        content_length,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionTransport for AnthropicTransport {
    async fn send(&self, req: &ProviderRequest) -> Result<RawCompletion> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = build_messages_body(req);

        tracing::debug!(model = %req.model, url = %url, "anthropic completion request");

        let start = Instant::now();
        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(ProviderId::Anthropic, self.timeout_ms, e))?;

        let status = resp.status();
        let resp_text = resp
            .text()
            .await
            .map_err(|e| from_reqwest(ProviderId::Anthropic, self.timeout_ms, e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            return Err(classify_status(
                ProviderId::Anthropic,
                &req.model,
                status.as_u16(),
                &resp_text,
            ));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_messages_response(&resp_json, latency_ms)
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Anthropic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "claude-sonnet-4-5-20250929".into(),
            system_blocks: vec!["You are a reviewer.".into(), "Respond with JSON.".into()],
            user_prompt: "Review this.".into(),
            assistant_prefill: r#"{"overallScore":"#.into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    #[test]
    fn body_sends_system_blocks_as_segments() {
        let body = build_messages_body(&request());
        let system = body["system"].as_array().unwrap();
        assert_eq!(system.len(), 2);
        assert_eq!(system[0]["text"], "You are a reviewer.");
        assert_eq!(system[1]["text"], "Respond with JSON.");
    }

    #[test]
    fn body_seeds_assistant_turn_with_prefill() {
        let body = build_messages_body(&request());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], r#"{"overallScore":"#);
    }

    #[test]
    fn body_omits_assistant_turn_without_prefill() {
        let mut req = request();
        req.assistant_prefill.clear();
        let body = build_messages_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn response_concatenates_text_blocks() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": " 73, "},
                {"type": "text", "text": "\"sections\": []}"},
            ],
            "stop_reason": "end_turn",
        });
        let raw = parse_messages_response(&body, 1200).unwrap();
        assert_eq!(raw.text, " 73, \"sections\": []}");
        assert_eq!(raw.stop_reason, StopReason::Stop);
        assert_eq!(raw.latency_ms, 1200);
        assert_eq!(raw.content_length, raw.text.len());
    }

    #[test]
    fn max_tokens_stop_reason_is_preserved() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "{\"overallScore\": 80"}],
            "stop_reason": "max_tokens",
        });
        let raw = parse_messages_response(&body, 10).unwrap();
        assert_eq!(raw.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn unknown_stop_reason_maps_to_other() {
        assert_eq!(parse_stop_reason(Some("tool_use")), StopReason::Other);
        assert_eq!(parse_stop_reason(None), StopReason::Other);
    }
}
