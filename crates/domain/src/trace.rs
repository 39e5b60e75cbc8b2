use serde::Serialize;

/// Structured trace events emitted across all copylens crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CompletionRequest {
        provider: String,
        model: String,
        kind: String,
        duration_ms: u64,
        stop_reason: String,
        content_length: usize,
    },
    RecoveryRepair {
        kind: String,
        repaired: bool,
    },
    ReviewDegraded {
        session_id: String,
        raw_chars: usize,
    },
    SessionRecorded {
        session_id: String,
        kind: String,
    },
    SessionSummaryWritten {
        session_id: String,
    },
}

impl TraceEvent {
    /// Emit this event as a single structured JSON line at info level.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(target: "copylens::trace", "{json}"),
            Err(e) => tracing::warn!("failed to serialize trace event: {e}"),
        }
    }
}
