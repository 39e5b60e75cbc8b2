//! Response recovery.
//!
//! A completion is *supposed* to contain a JSON document but is not
//! contractually guaranteed to: it may be wrapped in markdown fences, padded
//! with prose, or carry raw control bytes inside string literals. Recovery
//! reconstructs a syntactically valid JSON value from that input or fails
//! with the original text and the parser-reported byte offset — it never
//! partially succeeds and never invents data.
//!
//! Order of operations: strip fences, re-prepend the assistant prefill (the
//! transport never echoes the seed back), cut the first-`{`-to-last-`}` span,
//! strict parse, one repair pass, strict parse again.

use cl_domain::error::{Error, Result};
use serde_json::Value;

/// A successfully recovered JSON value, with a note of whether the repair
/// pass was needed (well-formed completions must never exercise it).
#[derive(Debug, Clone)]
pub struct Recovered {
    pub value: Value,
    pub repaired: bool,
}

/// Reconstruct a JSON value from a raw completion.
pub fn recover(raw_text: &str, assistant_prefill: &str) -> Result<Recovered> {
    let cleaned = strip_code_fences(raw_text);
    let reconstructed = format!("{assistant_prefill}{cleaned}");

    let candidate = match brace_span(&reconstructed) {
        Some(span) => span,
        None => {
            return Err(Error::UnparsableCompletion {
                raw: raw_text.to_string(),
                offset: 0,
            })
        }
    };

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(Recovered {
            value,
            repaired: false,
        });
    }

    let repaired = repair(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Ok(Recovered {
            value,
            repaired: true,
        }),
        Err(e) => Err(Error::UnparsableCompletion {
            raw: raw_text.to_string(),
            offset: byte_offset(&repaired, e.line(), e.column()),
        }),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cleanup steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Remove markdown fence markers anywhere in the text — models sometimes
/// emit stray fences mid-stream, not just at the boundaries.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// The span from the first `{` to the last `}`, tolerating leading and
/// trailing prose the model may add despite instructions.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// One left-to-right repair scan.
///
/// Inside string literals (tracked by toggling on unescaped `"`, with a
/// one-character escape flag reset after every character), raw control
/// characters are rewritten to their two-character escape sequences. Outside
/// strings everything is kept as-is except a trailing comma immediately
/// before a closing `}`/`]`, which is dropped. Structural whitespace between
/// tokens is untouched — only control bytes *inside* string values are
/// illegal per the JSON grammar.
fn repair(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{0008}' => out.push_str("\\b"),
                '\u{000C}' => out.push_str("\\f"),
                _ => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                ',' => {
                    let mut j = i + 1;
                    while j < chars.len() && chars[j].is_whitespace() {
                        j += 1;
                    }
                    let trailing = j < chars.len() && (chars[j] == '}' || chars[j] == ']');
                    if !trailing {
                        out.push(c);
                    }
                }
                _ => out.push(c),
            }
        }
    }
    out
}

/// Convert serde's 1-based line/column into a byte offset in `text`.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, l) in text.lines().enumerate() {
        if idx + 1 == line {
            return offset + column.saturating_sub(1).min(l.len());
        }
        offset += l.len() + 1;
    }
    offset.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW_PREFILL: &str = r#"{"overallScore":"#;

    #[test]
    fn well_formed_completion_never_exercises_repair() {
        let recovered = recover(r#" 73, "sections": []}"#, REVIEW_PREFILL).unwrap();
        assert!(!recovered.repaired);
        assert_eq!(
            recovered.value,
            serde_json::json!({"overallScore": 73, "sections": []})
        );
    }

    #[test]
    fn fenced_completion_equals_unfenced_equivalent() {
        let unfenced = recover(r#" 85, "sections": []}"#, REVIEW_PREFILL).unwrap();
        let fenced = recover("```json\n 85, \"sections\": []}\n```", REVIEW_PREFILL).unwrap();
        assert_eq!(fenced.value, unfenced.value);
    }

    #[test]
    fn stray_mid_stream_fence_is_stripped() {
        let recovered =
            recover(" 85, ```\n\"sections\": []}", REVIEW_PREFILL).unwrap();
        assert_eq!(recovered.value["overallScore"], 85);
    }

    #[test]
    fn fence_scenario_from_full_shape() {
        let raw = "```json\n85, \"sections\":[{\"title\":\"X\",\"content\":\"Y\",\"items\":[]}]\n```";
        let recovered = recover(raw, REVIEW_PREFILL).unwrap();
        assert_eq!(recovered.value["overallScore"], 85);
        assert_eq!(recovered.value["sections"][0]["title"], "X");
        assert_eq!(recovered.value["sections"][0]["content"], "Y");
    }

    #[test]
    fn leading_and_trailing_prose_is_tolerated() {
        let raw = "Here is my review:\n\n{\"a\": 1}\n\nHope that helps!";
        let recovered = recover(raw, "").unwrap();
        assert_eq!(recovered.value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn raw_newline_inside_string_keeps_logical_newline() {
        let raw = "{\"a\":\"line1\nline2\"}";
        let recovered = recover(raw, "").unwrap();
        assert!(recovered.repaired);
        assert_eq!(recovered.value["a"], "line1\nline2");
    }

    #[test]
    fn tab_in_string_and_trailing_comma_repair_in_one_pass() {
        let raw = "{\"a\":\"col1\tcol2\", \"b\": [1, 2,], }";
        let recovered = recover(raw, "").unwrap();
        assert!(recovered.repaired);
        assert_eq!(recovered.value["a"], "col1\tcol2");
        assert_eq!(recovered.value["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn structural_whitespace_between_tokens_survives_repair() {
        // The newline between tokens is legal; only the one inside the
        // string must be escaped.
        let raw = "{\n  \"a\": \"x\ny\",\n  \"b\": 2\n}";
        let recovered = recover(raw, "").unwrap();
        assert_eq!(recovered.value["a"], "x\ny");
        assert_eq!(recovered.value["b"], 2);
    }

    #[test]
    fn escaped_quote_does_not_end_string_tracking() {
        let raw = "{\"a\":\"he said \\\"hi\\\"\tok\"}";
        let recovered = recover(raw, "").unwrap();
        assert_eq!(recovered.value["a"], "he said \"hi\"\tok");
    }

    #[test]
    fn prefill_roundtrip_property() {
        let recovered = recover(" 73, \"sections\": []}", REVIEW_PREFILL).unwrap();
        assert_eq!(
            recovered.value,
            serde_json::json!({"overallScore": 73, "sections": []})
        );
    }

    #[test]
    fn hopeless_text_fails_with_raw_and_offset() {
        let err = recover("{\"a\": 1 2 3 nope", "").unwrap_err();
        match err {
            Error::UnparsableCompletion { raw, .. } => {
                assert_eq!(raw, "{\"a\": 1 2 3 nope");
            }
            other => panic!("expected UnparsableCompletion, got {other:?}"),
        }
    }

    #[test]
    fn unrepairable_document_reports_parser_offset() {
        let raw = "{\"a\": nope}";
        let err = recover(raw, "").unwrap_err();
        match err {
            Error::UnparsableCompletion { offset, .. } => {
                assert!(offset >= 6 && offset < raw.len(), "offset {offset}");
            }
            other => panic!("expected UnparsableCompletion, got {other:?}"),
        }
    }

    #[test]
    fn text_without_braces_fails() {
        let err = recover("I could not produce JSON, sorry.", "").unwrap_err();
        assert!(matches!(err, Error::UnparsableCompletion { offset: 0, .. }));
    }

    #[test]
    fn repair_leaves_control_escapes_already_present_alone() {
        let raw = "{\"a\":\"line1\\nline2\"}";
        let recovered = recover(raw, "").unwrap();
        assert!(!recovered.repaired);
        assert_eq!(recovered.value["a"], "line1\nline2");
    }

    #[test]
    fn byte_offset_maps_line_and_column() {
        let text = "ab\ncde\nf";
        assert_eq!(byte_offset(text, 1, 1), 0);
        assert_eq!(byte_offset(text, 2, 2), 4);
        assert_eq!(byte_offset(text, 3, 1), 7);
    }
}
