//! Shared helpers for transport adapters: reqwest error conversion and
//! HTTP-status failure classification. Keeping classification here means
//! provider differences never leak past the invoker boundary.

use cl_domain::config::ProviderId;
use cl_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeouts map to [`Error::UpstreamTimeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(provider: ProviderId, timeout_ms: u64, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::UpstreamTimeout {
            provider: provider.to_string(),
            timeout_ms,
        }
    } else {
        Error::Http(e.to_string())
    }
}

/// Map a non-success HTTP status to a distinctly typed error kind.
///
/// - 401/403 → `InvalidCredentials` (fatal, operator action)
/// - 404     → `UnsupportedModel` (fatal; model existence is never validated
///   before the call, so unknown names surface here)
/// - 429     → `RateLimited` (retriable after backoff)
/// - 5xx/529 → `UpstreamOverloaded` (retriable)
/// - rest    → `Http`
pub(crate) fn classify_status(
    provider: ProviderId,
    model: &str,
    status: u16,
    body: &str,
) -> Error {
    let message = truncate_body(body);
    match status {
        401 | 403 => Error::InvalidCredentials {
            provider: provider.to_string(),
            message,
        },
        404 => Error::UnsupportedModel {
            provider: provider.to_string(),
            model: model.to_string(),
            message,
        },
        429 => Error::RateLimited {
            provider: provider.to_string(),
            message,
        },
        s if s >= 500 => Error::UpstreamOverloaded {
            provider: provider.to_string(),
            status: s,
            message,
        },
        s => Error::Http(format!("{provider}: HTTP {s} - {message}")),
    }
}

/// Error bodies can be arbitrarily large; keep enough for diagnosis.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}
