//! OpenRouter gateway transport.
//!
//! Speaks the OpenAI chat-completions contract: system blocks are flattened
//! into one system message joined with blank lines, and the response arrives
//! in a choice-list wrapper. Both differences are normalized away here so the
//! recovery parser sees the same [`RawCompletion`] as with the primary
//! provider.

use crate::traits::{CompletionTransport, ProviderRequest, RawCompletion, StopReason};
use crate::util::{classify_status, from_reqwest};
use cl_domain::config::{Config, ProviderId};
use cl_domain::error::{Error, Result};
use serde_json::Value;
use std::time::Instant;

/// Transport adapter for the OpenRouter gateway.
pub struct OpenRouterTransport {
    base_url: String,
    api_key: String,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl OpenRouterTransport {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = crate::resolver::credential(cfg, ProviderId::Openrouter)?;
        let timeout_ms = cfg.completion.timeout_ms;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| from_reqwest(ProviderId::Openrouter, timeout_ms, e))?;

        Ok(Self {
            base_url: cfg
                .base_url(ProviderId::Openrouter)
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
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the chat-completions request body. The gateway accepts a single
/// system string, so ordered blocks are joined with blank-line separators —
/// a representational change, not a semantic one.
fn build_chat_body(req: &ProviderRequest) -> Value {
    let mut messages: Vec<Value> = Vec::new();
    if !req.system_blocks.is_empty() {
        messages.push(serde_json::json!({
            "role": "system",
            "content": req.system_blocks.join("\n\n"),
        }));
    }
    messages.push(serde_json::json!({
        "role": "user",
        "content": req.user_prompt,
    }));
    if !req.assistant_prefill.is_empty() {
        messages.push(serde_json::json!({
            "role": "assistant",
            "content": req.assistant_prefill,
        }));
    }

    serde_json::json!({
        "model": req.model,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
        "messages": messages,
    })
}

fn parse_finish_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("stop") => StopReason::Stop,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Other,
    }
}

fn parse_chat_response(body: &Value, latency_ms: u64) -> Result<RawCompletion> {
    let choice = body
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| Error::Http("openrouter: response has no choices".into()))?;

    let text = choice
        .pointer("/message/content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let stop_reason =
        parse_finish_reason(choice.get("finish_reason").and_then(|v| v.as_str()));
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
impl CompletionTransport for OpenRouterTransport {
    async fn send(&self, req: &ProviderRequest) -> Result<RawCompletion> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_chat_body(req);

        tracing::debug!(model = %req.model, url = %url, "openrouter completion request");

        let start = Instant::now();
        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(ProviderId::Openrouter, self.timeout_ms, e))?;

        let status = resp.status();
        let resp_text = resp
            .text()
            .await
            .map_err(|e| from_reqwest(ProviderId::Openrouter, self.timeout_ms, e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            return Err(classify_status(
                ProviderId::Openrouter,
                &req.model,
                status.as_u16(),
                &resp_text,
            ));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&resp_json, latency_ms)
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Openrouter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "anthropic/claude-3.5-sonnet".into(),
            system_blocks: vec!["Role.".into(), "Rules.".into()],
            user_prompt: "Review this.".into(),
            assistant_prefill: r#"{"improvedSubject":"#.into(),
            temperature: 0.8,
            max_tokens: 2000,
        }
    }

    #[test]
    fn system_blocks_join_with_blank_lines() {
        let body = build_chat_body(&request());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Role.\n\nRules.");
    }

    #[test]
    fn prefill_is_the_final_assistant_message() {
        let body = build_chat_body(&request());
        let messages = body["messages"].as_array().unwrap();
        let last = messages.last().unwrap();
        assert_eq!(last["role"], "assistant");
        assert_eq!(last["content"], r#"{"improvedSubject":"#);
    }

    #[test]
    fn choice_list_normalizes_to_raw_completion() {
        let body = serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": " \"Hi\", \"improvedBody\": \"x\"}"},
                "finish_reason": "stop",
            }],
        });
        let raw = parse_chat_response(&body, 900).unwrap();
        assert_eq!(raw.text, " \"Hi\", \"improvedBody\": \"x\"}");
        assert_eq!(raw.stop_reason, StopReason::Stop);
    }

    #[test]
    fn length_finish_reason_maps_to_max_tokens() {
        let body = serde_json::json!({
            "choices": [{
                "message": {"content": "{\"improvedSubject\": \"cut"},
                "finish_reason": "length",
            }],
        });
        let raw = parse_chat_response(&body, 5).unwrap();
        assert_eq!(raw.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let body = serde_json::json!({"choices": []});
        assert!(parse_chat_response(&body, 0).is_err());
    }
}
