//! Provider plumbing: resolution, model-name normalization, and the two
//! transport adapters (Anthropic-native and the OpenRouter gateway).
//!
//! Everything provider-specific stays behind [`CompletionTransport`]; the
//! pipeline above this crate sees only [`RawCompletion`].

pub mod anthropic;
pub mod openrouter;
pub mod resolver;
pub mod traits;
pub(crate) mod util;

use cl_domain::config::{Config, ProviderId};
use cl_domain::error::Result;
use std::sync::Arc;

pub use resolver::{normalize_model, resolve_provider};
pub use traits::{CompletionTransport, ProviderRequest, RawCompletion, StopReason};

/// Instantiate the transport adapter for a resolved provider.
///
/// Credentials are resolved eagerly here, so a missing or placeholder key
/// fails before any network call.
pub fn transport_for(config: &Config, provider: ProviderId) -> Result<Arc<dyn CompletionTransport>> {
    match provider {
        ProviderId::Anthropic => anthropic::AnthropicTransport::from_config(config)
            .map(|t| Arc::new(t) as Arc<dyn CompletionTransport>),
        ProviderId::Openrouter => openrouter::OpenRouterTransport::from_config(config)
            .map(|t| Arc::new(t) as Arc<dyn CompletionTransport>),
    }
}
