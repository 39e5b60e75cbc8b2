//! The end-to-end task flow: resolve → normalize → assemble → invoke →
//! recover → validate, with a fire-and-forget session record at the end.
//!
//! One parameterized flow serves all task kinds and both providers; the only
//! provider-specific code lives behind [`CompletionTransport`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use cl_domain::config::{Config, ProviderId};
use cl_domain::error::{Error, Result};
use cl_domain::result::{ReviewResult, ReviewSection, TaskResult};
use cl_domain::task::{CompletionRequest, TaskKind};
use cl_domain::trace::TraceEvent;
use cl_providers::{transport_for, CompletionTransport, ProviderRequest, RawCompletion, StopReason};
use cl_sessions::{CallRecord, SessionHandle, SessionSink};

use crate::prompt::{build_prompt, AssembledPrompt, KnowledgeBase};
use crate::recover::recover;
use crate::validate::validate;

/// Shown to the caller when a degraded review has nothing usable to say.
const DEGRADED_FALLBACK_TEXT: &str =
    "Unable to generate detailed analysis. Please try again.";
const DEGRADED_FALLBACK_SCORE: i64 = 50;

/// The completion-response ingestion pipeline.
pub struct Pipeline {
    config: Config,
    knowledge: KnowledgeBase,
    sink: Arc<SessionSink>,
    transports: RwLock<HashMap<ProviderId, Arc<dyn CompletionTransport>>>,
}

impl Pipeline {
    pub fn new(config: Config, knowledge: KnowledgeBase) -> Self {
        let sink = Arc::new(SessionSink::new(&config.sessions.dir));
        Self {
            config,
            knowledge,
            sink,
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Pre-register a transport for a provider. Used by tests and by embedders
    /// that construct transports themselves.
    pub fn with_transport(self, provider: ProviderId, transport: Arc<dyn CompletionTransport>) -> Self {
        self.transports.write().insert(provider, transport);
        self
    }

    /// Run one task end to end. The session handle is carried explicitly so
    /// concurrent requests can never misattribute log entries.
    pub async fn run_task(
        &self,
        request: &CompletionRequest,
        session: &SessionHandle,
    ) -> Result<TaskResult> {
        let hint = request.model_hint.as_deref();
        let provider = cl_providers::resolve_provider(&self.config, hint)?;
        let model =
            cl_providers::normalize_model(hint, provider, &self.config.completion.default_model);
        let prompt = build_prompt(
            request.kind,
            &request.subject,
            &request.body,
            request.prior_review.as_ref(),
            &self.knowledge,
        );

        let provider_req = ProviderRequest {
            model: model.clone(),
            system_blocks: prompt.system_blocks.clone(),
            user_prompt: prompt.user_prompt.clone(),
            assistant_prefill: prompt.assistant_prefill.clone(),
            temperature: temperature_for(request.kind),
            max_tokens: self.max_tokens_for(request.kind),
        };

        let transport = self.transport(provider)?;
        let raw = self.invoke(&transport, provider, &provider_req).await?;

        TraceEvent::CompletionRequest {
            provider: provider.to_string(),
            model: model.clone(),
            kind: request.kind.as_str().to_string(),
            duration_ms: raw.latency_ms,
            stop_reason: raw.stop_reason.as_str().to_string(),
            content_length: raw.content_length,
        }
        .emit();

        // A truncated body is never parsed: a cut JSON document produces
        // misleading partial-repair results even when it happens to parse.
        if raw.stop_reason == StopReason::MaxTokens {
            self.record(request.kind, session, &prompt, &model, &raw, None);
            return Err(Error::TruncatedOutput {
                provider: provider.to_string(),
                model,
            });
        }

        match recover(&raw.text, &prompt.assistant_prefill) {
            Ok(recovered) => {
                TraceEvent::RecoveryRepair {
                    kind: request.kind.as_str().to_string(),
                    repaired: recovered.repaired,
                }
                .emit();
                // A shape-invalid completion still gets a log line, same as
                // truncated and unparsable ones.
                let result = match validate(request.kind, recovered.value) {
                    Ok(result) => result,
                    Err(e) => {
                        self.record(request.kind, session, &prompt, &model, &raw, None);
                        return Err(e);
                    }
                };
                let parsed = serde_json::to_value(&result).ok();
                self.record(request.kind, session, &prompt, &model, &raw, parsed);
                Ok(result)
            }
            // Review alone tolerates an unrecoverable completion, answering
            // with a fixed low-confidence score and the raw text. Improve and
            // Combined fail outright — inventing a rewrite is never safe.
            Err(Error::UnparsableCompletion { .. }) if request.kind == TaskKind::Review => {
                tracing::warn!(
                    session_id = %session.id,
                    "review completion unrecoverable, returning degraded fallback"
                );
                TraceEvent::ReviewDegraded {
                    session_id: session.id.clone(),
                    raw_chars: raw.text.len(),
                }
                .emit();
                self.record(request.kind, session, &prompt, &model, &raw, None);
                Ok(TaskResult::Review(degraded_review(&raw.text)))
            }
            Err(e) => {
                self.record(request.kind, session, &prompt, &model, &raw, None);
                Err(e)
            }
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn transport(&self, provider: ProviderId) -> Result<Arc<dyn CompletionTransport>> {
        if let Some(t) = self.transports.read().get(&provider) {
            return Ok(Arc::clone(t));
        }
        let transport = transport_for(&self.config, provider)?;
        self.transports
            .write()
            .insert(provider, Arc::clone(&transport));
        Ok(transport)
    }

    /// Send with a hard wall-clock bound. This is the only cancellation
    /// point: recovery and validation are pure, bounded-time computations.
    async fn invoke(
        &self,
        transport: &Arc<dyn CompletionTransport>,
        provider: ProviderId,
        req: &ProviderRequest,
    ) -> Result<RawCompletion> {
        let timeout_ms = self.config.completion.timeout_ms;
        let timeout = std::time::Duration::from_millis(timeout_ms);
        match tokio::time::timeout(timeout, transport.send(req)).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamTimeout {
                provider: provider.to_string(),
                timeout_ms,
            }),
        }
    }

    fn max_tokens_for(&self, kind: TaskKind) -> u32 {
        match kind {
            TaskKind::AnalyzeAndImprove => self.config.completion.combined_max_tokens,
            _ => self.config.completion.max_tokens,
        }
    }

    fn record(
        &self,
        kind: TaskKind,
        session: &SessionHandle,
        prompt: &AssembledPrompt,
        model: &str,
        raw: &RawCompletion,
        parsed_result: Option<serde_json::Value>,
    ) {
        // The response path never waits on the log write.
        let _ = self.sink.record_detached(
            kind,
            &session.id,
            CallRecord {
                system_text: prompt.system_blocks.join("\n\n"),
                user_text: prompt.user_prompt.clone(),
                raw_response: raw.text.clone(),
                parsed_result,
                model: model.to_string(),
                latency_ms: raw.latency_ms,
                stop_reason: raw.stop_reason.as_str().to_string(),
                content_length: raw.content_length,
            },
        );
    }
}

fn temperature_for(kind: TaskKind) -> f32 {
    match kind {
        TaskKind::Review => 0.7,
        TaskKind::Improve | TaskKind::AnalyzeAndImprove => 0.8,
    }
}

fn degraded_review(raw_text: &str) -> ReviewResult {
    let content = if raw_text.trim().is_empty() {
        DEGRADED_FALLBACK_TEXT.to_string()
    } else {
        raw_text.to_string()
    };
    ReviewResult {
        overall_score: DEGRADED_FALLBACK_SCORE,
        sections: vec![ReviewSection {
            title: "Analysis".into(),
            content,
            items: vec![],
            highlight: None,
        }],
    }
}
