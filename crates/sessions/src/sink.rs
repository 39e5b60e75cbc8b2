//! Append-only session logs with a Markdown summary.
//!
//! Each session gets a `<sessionId>.jsonl` file; every recorded call is one
//! JSON line. Once a session holds both a review half and an improve half
//! (a combined call counts as both), a `<sessionId>.md` summary is written
//! alongside.
//!
//! The sink is a fire-and-forget consumer: [`SessionSink::record_detached`]
//! never blocks the caller's response path, and any write error is logged to
//! the operational channel and discarded.
//!
//! In-memory state is bounded: only the handful of fields the summary needs
//! are held per pending session (never the prompts or the raw response), and
//! they are dropped as soon as the summary lands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use cl_domain::error::{Error, Result};
use cl_domain::task::TaskKind;
use cl_domain::trace::TraceEvent;

/// Everything the pipeline knows about one completed provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub system_text: String,
    pub user_text: String,
    pub raw_response: String,
    /// The validated result as JSON, absent when the call degraded or failed
    /// after the response was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_result: Option<serde_json::Value>,
    pub model: String,
    pub latency_ms: u64,
    pub stop_reason: String,
    pub content_length: usize,
}

/// One line of the on-disk session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogLine {
    timestamp: String,
    kind: String,
    #[serde(flatten)]
    record: CallRecord,
}

/// The few fields the summary renders. The full [`CallRecord`] goes to disk
/// only; keeping it in memory would grow with total traffic.
#[derive(Debug, Clone)]
struct CallDigest {
    model: String,
    latency_ms: u64,
    stop_reason: String,
    content_length: usize,
    overall_score: Option<i64>,
    improved_subject: Option<String>,
}

impl CallDigest {
    fn from_record(record: &CallRecord) -> Self {
        let parsed = record.parsed_result.as_ref();
        Self {
            model: record.model.clone(),
            latency_ms: record.latency_ms,
            stop_reason: record.stop_reason.clone(),
            content_length: record.content_length,
            overall_score: parsed
                .and_then(|v| v.get("overallScore"))
                .and_then(|v| v.as_i64()),
            improved_subject: parsed
                .and_then(|v| v.get("improvedSubject"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    review: Option<CallDigest>,
    improve: Option<CallDigest>,
    combined: Option<CallDigest>,
    summary_written: bool,
}

impl SessionState {
    fn summary_ready(&self) -> bool {
        self.combined.is_some() || (self.review.is_some() && self.improve.is_some())
    }

    /// Once the summary is on disk only the flag matters.
    fn drop_digests(&mut self) {
        self.review = None;
        self.improve = None;
        self.combined = None;
    }
}

/// Writes per-session JSONL logs and, once both halves of a session are
/// present, a Markdown summary.
pub struct SessionSink {
    base_dir: PathBuf,
    state: RwLock<HashMap<String, SessionState>>,
}

impl SessionSink {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Record one call. Appends a JSONL line, then writes the summary if
    /// this record completes the session.
    pub async fn record(
        &self,
        kind: TaskKind,
        session_id: &str,
        record: CallRecord,
    ) -> Result<()> {
        let digest = CallDigest::from_record(&record);
        let line = LogLine {
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.as_str().to_string(),
            record,
        };
        let buf = format!("{}\n", serde_json::to_string(&line)?);
        let path = self.base_dir.join(format!("{session_id}.jsonl"));
        let dir = self.base_dir.clone();

        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            std::fs::create_dir_all(&dir).map_err(Error::Io)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(Error::Io)?;
            file.write_all(buf.as_bytes()).map_err(Error::Io)?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        TraceEvent::SessionRecorded {
            session_id: session_id.to_string(),
            kind: kind.as_str().to_string(),
        }
        .emit();

        let summary = {
            let mut state = self.state.write();
            let entry = state.entry(session_id.to_string()).or_default();
            if !entry.summary_written {
                match kind {
                    TaskKind::Review => entry.review = Some(digest),
                    TaskKind::Improve => entry.improve = Some(digest),
                    TaskKind::AnalyzeAndImprove => entry.combined = Some(digest),
                }
            }
            if entry.summary_ready() && !entry.summary_written {
                entry.summary_written = true;
                let markdown = render_summary(session_id, entry);
                entry.drop_digests();
                Some(markdown)
            } else {
                None
            }
        };

        if let Some(markdown) = summary {
            let path = self.base_dir.join(format!("{session_id}.md"));
            tokio::task::spawn_blocking(move || std::fs::write(&path, markdown).map_err(Error::Io))
                .await
                .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;
            TraceEvent::SessionSummaryWritten {
                session_id: session_id.to_string(),
            }
            .emit();
        }

        Ok(())
    }

    /// Fire-and-forget variant used on the response path: the write happens
    /// on a detached task and errors never reach the caller. The returned
    /// handle exists so tests can join the task; callers may ignore it.
    pub fn record_detached(
        self: &Arc<Self>,
        kind: TaskKind,
        session_id: &str,
        record: CallRecord,
    ) -> tokio::task::JoinHandle<()> {
        let sink = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.record(kind, &session_id, record).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "discarding session log write failure"
                );
            }
        })
    }
}

/// Render the human-readable session summary.
fn render_summary(session_id: &str, state: &SessionState) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Session {session_id}\n\n"));

    let mut half = |title: &str, digest: &CallDigest| {
        out.push_str(&format!("## {title}\n\n"));
        out.push_str(&format!(
            "- model: `{}`\n- latency: {}ms\n- stop reason: {}\n- response bytes: {}\n",
            digest.model, digest.latency_ms, digest.stop_reason, digest.content_length
        ));
        if let Some(score) = digest.overall_score {
            out.push_str(&format!("- overall score: {score}/100\n"));
        }
        if let Some(subject) = &digest.improved_subject {
            out.push_str(&format!("- improved subject: {subject}\n"));
        }
        out.push('\n');
    };

    if let Some(digest) = &state.combined {
        half("Analyze and improve", digest);
    }
    if let Some(digest) = &state.review {
        half("Review", digest);
    }
    if let Some(digest) = &state.improve {
        half("Improve", digest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str) -> CallRecord {
        CallRecord {
            system_text: "system".into(),
            user_text: "user".into(),
            raw_response: "{}".into(),
            parsed_result: Some(serde_json::json!({"overallScore": 85})),
            model: model.into(),
            latency_ms: 1234,
            stop_reason: "stop".into(),
            content_length: 2,
        }
    }

    #[tokio::test]
    async fn record_appends_one_jsonl_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());

        sink.record(TaskKind::Review, "s1", record("m")).await.unwrap();
        sink.record(TaskKind::Review, "s1", record("m")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("s1.jsonl")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["kind"], "review");
        assert_eq!(parsed["latency_ms"], 1234);
    }

    #[tokio::test]
    async fn summary_written_once_both_halves_present() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());
        let summary_path = dir.path().join("s2.md");

        sink.record(TaskKind::Review, "s2", record("m")).await.unwrap();
        assert!(!summary_path.exists());

        sink.record(TaskKind::Improve, "s2", record("m")).await.unwrap();
        assert!(summary_path.exists());
        let markdown = std::fs::read_to_string(&summary_path).unwrap();
        assert!(markdown.contains("# Session s2"));
        assert!(markdown.contains("overall score: 85/100"));
    }

    #[tokio::test]
    async fn combined_call_alone_triggers_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());

        sink.record(TaskKind::AnalyzeAndImprove, "s3", record("m"))
            .await
            .unwrap();
        assert!(dir.path().join("s3.md").exists());
    }

    #[tokio::test]
    async fn summary_is_not_rewritten_on_later_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());

        sink.record(TaskKind::AnalyzeAndImprove, "s4", record("m1"))
            .await
            .unwrap();
        let first = std::fs::read_to_string(dir.path().join("s4.md")).unwrap();

        sink.record(TaskKind::Review, "s4", record("m2")).await.unwrap();
        let second = std::fs::read_to_string(dir.path().join("s4.md")).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn summarized_sessions_keep_only_a_flag_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());

        for i in 0..50 {
            let id = format!("bulk-{i}");
            sink.record(TaskKind::AnalyzeAndImprove, &id, record("m"))
                .await
                .unwrap();
        }

        let state = sink.state.read();
        for i in 0..50 {
            let entry = state.get(&format!("bulk-{i}")).unwrap();
            assert!(entry.summary_written);
            assert!(entry.review.is_none());
            assert!(entry.improve.is_none());
            assert!(entry.combined.is_none());
        }
    }

    #[tokio::test]
    async fn pending_sessions_hold_digests_not_prompts() {
        // The retained type has no prompt or raw-response fields at all;
        // check the digest carries just the summary inputs.
        let dir = tempfile::tempdir().unwrap();
        let sink = SessionSink::new(dir.path());

        sink.record(TaskKind::Review, "pending", record("m")).await.unwrap();

        let state = sink.state.read();
        let digest = state.get("pending").unwrap().review.as_ref().unwrap();
        assert_eq!(digest.model, "m");
        assert_eq!(digest.overall_score, Some(85));
        assert!(digest.improved_subject.is_none());
    }

    #[tokio::test]
    async fn record_surfaces_io_errors_on_unwritable_dir() {
        // A path under a regular file cannot be created.
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, "x").unwrap();

        let sink = SessionSink::new(&file_path.join("nested"));
        let err = sink
            .record(TaskKind::Review, "s5", record("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn detached_record_swallows_the_same_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, "x").unwrap();

        let sink = Arc::new(SessionSink::new(&file_path.join("nested")));
        let handle = sink.record_detached(TaskKind::Review, "s5", record("m"));
        // Joining proves the task finished without panicking; the error was
        // logged and discarded.
        handle.await.unwrap();
    }
}
