use crate::result::ReviewResult;
use serde::{Deserialize, Serialize};

/// The three kinds of work the pipeline performs on a piece of copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Score the copy and produce section-by-section feedback.
    Review,
    /// Rewrite the copy, guided by a prior review.
    Improve,
    /// Score and rewrite in a single provider call.
    AnalyzeAndImprove,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Review => "review",
            TaskKind::Improve => "improve",
            TaskKind::AnalyzeAndImprove => "analyze_and_improve",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One caller request, immutable once constructed.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub kind: TaskKind,
    /// The subject line under review.
    pub subject: String,
    /// The body copy under review.
    pub body: String,
    /// A previous review, used by [`TaskKind::Improve`] to ground the rewrite.
    pub prior_review: Option<ReviewResult>,
    /// Caller-supplied model identifier; `None` means the configured default.
    pub model_hint: Option<String>,
}

impl CompletionRequest {
    pub fn new(kind: TaskKind, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            body: body.into(),
            prior_review: None,
            model_hint: None,
        }
    }

    pub fn with_prior_review(mut self, review: ReviewResult) -> Self {
        self.prior_review = Some(review);
        self
    }

    pub fn with_model_hint(mut self, hint: impl Into<String>) -> Self {
        self.model_hint = Some(hint.into());
        self
    }
}
