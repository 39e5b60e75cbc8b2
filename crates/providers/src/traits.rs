use cl_domain::config::ProviderId;
use cl_domain::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic completion request.
///
/// System instructions stay an ordered sequence of independent blocks:
/// transports that accept multiple system segments send them as-is, the
/// gateway joins them with blank lines. `assistant_prefill` seeds the model's
/// own turn so the continuation is anchored to a known JSON prefix; providers
/// never echo the seed back.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// Provider-specific model identifier (already normalized).
    pub model: String,
    /// Ordered system instruction blocks.
    pub system_blocks: Vec<String>,
    /// The single task description.
    pub user_prompt: String,
    /// Literal fragment injected as the start of the assistant turn.
    pub assistant_prefill: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Natural end of turn.
    Stop,
    /// Output token budget exhausted. Truncated JSON cannot be trusted, so
    /// this is a hard failure signal for the caller.
    MaxTokens,
    Other,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Stop => "stop",
            StopReason::MaxTokens => "max_tokens",
            StopReason::Other => "other",
        }
    }
}

/// The raw, untrusted completion as it came off the wire, normalized across
/// transports before the recovery parser ever sees it.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub stop_reason: StopReason,
    pub latency_ms: u64,
    pub content_length: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One implementation per provider; the single parameterized seam that
/// replaces per-provider call-path duplication. Implementations translate
/// [`ProviderRequest`] to their wire format, forward the prefill as a seeded
/// assistant turn, and classify transport failures into the shared error
/// taxonomy.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Issue one completion call and capture timing and termination metadata.
    async fn send(&self, req: &ProviderRequest) -> Result<RawCompletion>;

    /// Which provider this transport targets.
    fn provider_id(&self) -> ProviderId;
}
