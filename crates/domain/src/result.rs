//! Typed result shapes returned to callers.
//!
//! Three task kinds share heavily overlapping fields; they are modeled as a
//! tagged union (`TaskResult`) with the shared sub-structures factored out,
//! so exhaustive handling is checked at compile time.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Review
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A key takeaway attached to a review section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHighlight {
    pub title: String,
    pub content: String,
}

/// One section of review feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSection {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<SectionHighlight>,
}

/// The full review: a score out of 100 plus ordered feedback sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Always clamped into `[0, 100]` by the shape validator.
    #[serde(rename = "overallScore")]
    pub overall_score: i64,
    pub sections: Vec<ReviewSection>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Improve
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One change the rewrite made. All fields except `category` are optional in
/// the wire shape; absent ones normalize to the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub category: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub signal: String,
}

/// The rewritten copy plus the change ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImproveResult {
    #[serde(rename = "improvedSubject")]
    pub improved_subject: String,
    #[serde(rename = "improvedBody")]
    pub improved_body: String,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    #[serde(default, rename = "furtherTips")]
    pub further_tips: Vec<String>,
    #[serde(default, rename = "expectedImpact", skip_serializing_if = "Option::is_none")]
    pub expected_impact: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Combined
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Score and rewrite from a single provider round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    #[serde(rename = "overallScore")]
    pub overall_score: i64,
    #[serde(rename = "improvedSubject")]
    pub improved_subject: String,
    #[serde(rename = "improvedBody")]
    pub improved_body: String,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    #[serde(default, rename = "furtherTips")]
    pub further_tips: Vec<String>,
    #[serde(default, rename = "expectedImpact", skip_serializing_if = "Option::is_none")]
    pub expected_impact: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tagged union
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A fully validated pipeline result, discriminated by the task kind that
/// produced it. Nothing partially shaped ever crosses this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    Review(ReviewResult),
    Improve(ImproveResult),
    Combined(CombinedResult),
}

impl TaskResult {
    /// Borrow the review half, if this result has one.
    pub fn as_review(&self) -> Option<&ReviewResult> {
        match self {
            TaskResult::Review(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_improve(&self) -> Option<&ImproveResult> {
        match self {
            TaskResult::Improve(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_combined(&self) -> Option<&CombinedResult> {
        match self {
            TaskResult::Combined(r) => Some(r),
            _ => None,
        }
    }
}
