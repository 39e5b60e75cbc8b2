/// Shared error type used across all copylens crates.
///
/// Every pipeline stage raises its own distinctly typed variant; stages never
/// re-wrap one kind as another, so a caller can always tell which stage failed
/// and whether a retry is worthwhile.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("config: {0}")]
    Config(String),

    #[error("provider {provider} timed out after {timeout_ms}ms")]
    UpstreamTimeout { provider: String, timeout_ms: u64 },

    #[error("rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    #[error("provider {provider} overloaded (HTTP {status}): {message}")]
    UpstreamOverloaded {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider {provider} rejected credentials: {message}")]
    InvalidCredentials { provider: String, message: String },

    #[error("provider {provider} does not know model '{model}': {message}")]
    UnsupportedModel {
        provider: String,
        model: String,
        message: String,
    },

    #[error("completion from {provider} was truncated at the output token limit (model '{model}')")]
    TruncatedOutput { provider: String, model: String },

    #[error("completion could not be recovered into JSON (parse failed at byte {offset})")]
    UnparsableCompletion { raw: String, offset: usize },

    #[error("result shape invalid: {0}")]
    InvalidResultShape(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a caller may reasonably retry the failed call (with backoff
    /// for rate limits). Everything else requires operator action or a
    /// different input.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamTimeout { .. }
                | Error::RateLimited { .. }
                | Error::UpstreamOverloaded { .. }
                | Error::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
