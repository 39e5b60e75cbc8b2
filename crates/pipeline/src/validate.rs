//! Shape validation.
//!
//! Enforces the minimal structural contract on a recovered JSON value and
//! normalizes optional fields: the score is clamped into `[0, 100]`, missing
//! optional arrays default to empty, and absent optional strings on change
//! entries normalize to `""`. Pure — the natural unit-test seam.

use cl_domain::error::{Error, Result};
use cl_domain::result::{CombinedResult, ImproveResult, ReviewResult, TaskResult};
use cl_domain::task::TaskKind;
use serde_json::Value;

/// Check a parsed value against the contract for `kind` and produce the
/// typed result. Fails with [`Error::InvalidResultShape`] when required
/// fields are absent — well-formed but semantically incomplete JSON.
pub fn validate(kind: TaskKind, mut value: Value) -> Result<TaskResult> {
    match kind {
        TaskKind::Review => {
            require_sections(&value)?;
            clamp_score(&mut value)?;
            let review: ReviewResult = from_value(value)?;
            Ok(TaskResult::Review(review))
        }
        TaskKind::Improve => {
            require_improved_copy(&value)?;
            let improved: ImproveResult = from_value(value)?;
            Ok(TaskResult::Improve(improved))
        }
        TaskKind::AnalyzeAndImprove => {
            require_improved_copy(&value)?;
            clamp_score(&mut value)?;
            let combined: CombinedResult = from_value(value)?;
            Ok(TaskResult::Combined(combined))
        }
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::InvalidResultShape(e.to_string()))
}

/// `overallScore` must be present and numeric; out-of-range values clamp to
/// the nearest bound. A literal 0 is a valid score, so this is a presence
/// check, not a truthiness check.
fn clamp_score(value: &mut Value) -> Result<()> {
    let score = value
        .get("overallScore")
        .ok_or_else(|| Error::InvalidResultShape("missing 'overallScore'".into()))?
        .as_f64()
        .ok_or_else(|| Error::InvalidResultShape("'overallScore' is not a number".into()))?;
    let clamped = score.clamp(0.0, 100.0).round() as i64;
    value["overallScore"] = Value::from(clamped);
    Ok(())
}

fn require_sections(value: &Value) -> Result<()> {
    match value.get("sections") {
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(Error::InvalidResultShape("'sections' is not an array".into())),
        None => Err(Error::InvalidResultShape("missing 'sections'".into())),
    }
}

fn require_improved_copy(value: &Value) -> Result<()> {
    for field in ["improvedSubject", "improvedBody"] {
        match value.get(field) {
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(Error::InvalidResultShape(format!(
                    "'{field}' is not a string"
                )))
            }
            None => return Err(Error::InvalidResultShape(format!("missing '{field}'"))),
        }
    }
    Ok(())
}
