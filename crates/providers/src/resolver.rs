//! Provider resolution and model-name normalization.
//!
//! Resolution precedence: an explicitly configured provider always wins; a
//! namespaced model hint (`vendor/model`) implies the gateway; otherwise the
//! primary provider. Credentials are checked here, before any network call.

use cl_domain::config::{Config, ProviderId};
use cl_domain::error::{Error, Result};

/// Keys that shipped in `.env.example` files and were never replaced.
/// Treated the same as a missing key.
const PLACEHOLDER_KEYS: &[&str] = &[
    "your-api-key-here",
    "your_anthropic_api_key_here",
    "your_openrouter_api_key_here",
    "changeme",
];

/// Alias table for the primary provider: short names the UI offers, mapped
/// to the exact versioned identifiers the API expects. Unknown names pass
/// through unchanged so new models work without a code change.
const ANTHROPIC_ALIASES: &[(&str, &str)] = &[
    ("claude-3.5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-sonnet-4.5", "claude-sonnet-4-5-20250929"),
    ("claude-sonnet-4-5", "claude-sonnet-4-5-20250929"),
    ("claude-opus-4.1", "claude-opus-4-1-20250805"),
    ("claude-opus-4-1", "claude-opus-4-1-20250805"),
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Choose the provider for a request and verify its credential is usable.
pub fn resolve_provider(config: &Config, model_hint: Option<&str>) -> Result<ProviderId> {
    let provider = match config.provider {
        // Explicit configuration wins regardless of the hint.
        Some(explicit) => explicit,
        None => match model_hint {
            // A namespaced name like "vendor/model" implies the gateway.
            Some(hint) if hint.contains('/') => ProviderId::Openrouter,
            _ => ProviderId::Anthropic,
        },
    };
    credential(config, provider)?;
    Ok(provider)
}

/// The usable API key for a provider, or `Error::Config` when it is absent
/// or still a placeholder. Fails fast, never on first use.
pub fn credential(config: &Config, provider: ProviderId) -> Result<String> {
    let key = config
        .endpoint(provider)
        .api_key
        .as_deref()
        .unwrap_or("")
        .trim();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key) {
        return Err(Error::Config(format!(
            "no usable API key configured for provider '{provider}'"
        )));
    }
    Ok(key.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map a caller-supplied (or default) model identifier to the form the
/// resolved provider expects.
///
/// Primary provider: strip an `anthropic/` namespace and apply the alias
/// table. Gateway: pass through verbatim, the gateway expects namespaced
/// names. No network validation happens here; a bad name surfaces later as
/// an `UnsupportedModel` transport error.
pub fn normalize_model(model_hint: Option<&str>, provider: ProviderId, default: &str) -> String {
    let name = model_hint.unwrap_or(default);
    match provider {
        ProviderId::Openrouter => name.to_string(),
        ProviderId::Anthropic => {
            let bare = name.strip_prefix("anthropic/").unwrap_or(name);
            ANTHROPIC_ALIASES
                .iter()
                .find(|(alias, _)| *alias == bare)
                .map(|(_, exact)| exact.to_string())
                .unwrap_or_else(|| bare.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys() -> Config {
        let mut cfg = Config::default();
        cfg.anthropic.api_key = Some("sk-ant-test".into());
        cfg.openrouter.api_key = Some("sk-or-test".into());
        cfg
    }

    #[test]
    fn explicit_provider_beats_namespaced_hint() {
        let mut cfg = config_with_keys();
        cfg.provider = Some(ProviderId::Anthropic);
        let provider = resolve_provider(&cfg, Some("openai/gpt-4o")).unwrap();
        assert_eq!(provider, ProviderId::Anthropic);
    }

    #[test]
    fn namespaced_hint_implies_gateway() {
        let cfg = config_with_keys();
        let provider = resolve_provider(&cfg, Some("meta-llama/llama-3-70b")).unwrap();
        assert_eq!(provider, ProviderId::Openrouter);
    }

    #[test]
    fn bare_hint_defaults_to_primary() {
        let cfg = config_with_keys();
        assert_eq!(
            resolve_provider(&cfg, Some("claude-sonnet-4-5")).unwrap(),
            ProviderId::Anthropic
        );
        assert_eq!(resolve_provider(&cfg, None).unwrap(), ProviderId::Anthropic);
    }

    #[test]
    fn missing_credential_fails_fast() {
        let cfg = Config::default();
        let err = resolve_provider(&cfg, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn placeholder_credential_fails_fast() {
        let mut cfg = Config::default();
        cfg.anthropic.api_key = Some("your-api-key-here".into());
        assert!(resolve_provider(&cfg, None).is_err());

        cfg.anthropic.api_key = Some("   ".into());
        assert!(resolve_provider(&cfg, None).is_err());
    }

    #[test]
    fn alias_table_maps_short_names() {
        assert_eq!(
            normalize_model(Some("claude-3.5-sonnet"), ProviderId::Anthropic, "d"),
            "claude-3-5-sonnet-20241022"
        );
        assert_eq!(
            normalize_model(Some("claude-sonnet-4-5"), ProviderId::Anthropic, "d"),
            "claude-sonnet-4-5-20250929"
        );
    }

    #[test]
    fn namespace_prefix_is_stripped_for_primary() {
        assert_eq!(
            normalize_model(
                Some("anthropic/claude-3.5-sonnet"),
                ProviderId::Anthropic,
                "d"
            ),
            "claude-3-5-sonnet-20241022"
        );
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(
            normalize_model(Some("claude-9-experimental"), ProviderId::Anthropic, "d"),
            "claude-9-experimental"
        );
    }

    #[test]
    fn gateway_names_pass_through_verbatim() {
        assert_eq!(
            normalize_model(Some("anthropic/claude-3.5-sonnet"), ProviderId::Openrouter, "d"),
            "anthropic/claude-3.5-sonnet"
        );
    }

    #[test]
    fn no_hint_uses_default() {
        assert_eq!(
            normalize_model(None, ProviderId::Anthropic, "claude-sonnet-4-5-20250929"),
            "claude-sonnet-4-5-20250929"
        );
    }
}
