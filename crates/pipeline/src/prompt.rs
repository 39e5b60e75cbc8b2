//! Prompt assembly.
//!
//! System instructions are kept as an ordered sequence of independent blocks
//! (role, injected knowledge base, output-format rules) so each transport can
//! represent them natively. The user prompt wraps subject and body in
//! unambiguous delimiters, which also lets log-recovery tooling extract them
//! deterministically later. Each task kind gets its own assistant prefill so
//! the model's continuation is anchored to a known JSON key.

use cl_domain::result::ReviewResult;
use cl_domain::task::TaskKind;

/// Opaque knowledge-base content injected into the system instructions.
/// Empty strings are simply skipped.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    /// Best-practice guidance text.
    pub best_practices: String,
    /// Patterns distilled from the best performing copies.
    pub best_performers: String,
}

/// The fully assembled conversation pieces for one request.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system_blocks: Vec<String>,
    pub user_prompt: String,
    pub assistant_prefill: String,
}

/// The literal JSON prefix seeding the assistant turn. Distinct per task
/// kind: the combined rules also lead with improvedSubject, so its seed
/// anchors one token deeper, at the opening quote of the value.
pub fn prefill_for(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Review => r#"{"overallScore":"#,
        TaskKind::Improve => r#"{"improvedSubject":"#,
        TaskKind::AnalyzeAndImprove => r#"{"improvedSubject": ""#,
    }
}

/// Build the ordered system blocks and the single task description.
pub fn build_prompt(
    kind: TaskKind,
    subject: &str,
    body: &str,
    prior_review: Option<&ReviewResult>,
    knowledge: &KnowledgeBase,
) -> AssembledPrompt {
    let mut system_blocks = vec![role_block(kind).to_string()];
    if !knowledge.best_practices.is_empty() {
        system_blocks.push(knowledge.best_practices.clone());
    }
    if !knowledge.best_performers.is_empty() {
        system_blocks.push(format!(
            "BEST PERFORMING PATTERNS (from our database):\n{}",
            knowledge.best_performers
        ));
    }
    system_blocks.push(format_rules(kind).to_string());

    AssembledPrompt {
        system_blocks,
        user_prompt: user_prompt(kind, subject, body, prior_review),
        assistant_prefill: prefill_for(kind).to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// System blocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_block(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Review => {
            "You are an expert cold email copywriter and analyst. Your role is to review \
             cold email copy and provide actionable, specific feedback to improve response \
             rates.\n\n\
             Your analysis should:\n\
             1. Be specific and actionable\n\
             2. Reference concrete examples from the best performing patterns\n\
             3. Provide a numerical score out of 100\n\
             4. Break down feedback into clear sections\n\
             5. Be constructive and encouraging while being honest"
        }
        TaskKind::Improve => {
            "You are an expert cold email copywriter. Your role is to rewrite cold emails \
             to maximize response rates based on proven best practices and patterns.\n\n\
             Your rewrite should:\n\
             1. Apply the feedback from the review\n\
             2. Follow the patterns from our best performing emails\n\
             3. Maintain the core value proposition but improve delivery\n\
             4. Be specific, personalized, and action-oriented\n\
             5. Optimize for clarity and brevity (70-95 words for body)\n\
             6. Use conversational, authentic tone"
        }
        TaskKind::AnalyzeAndImprove => {
            "You are an expert cold email copywriter and analyst. In a single pass you \
             score the given cold email against proven best practices, then rewrite it to \
             maximize response rates.\n\n\
             Your response should:\n\
             1. Score the original out of 100, honestly and consistently\n\
             2. Rewrite the copy applying the weaknesses you found\n\
             3. Keep the core value proposition but improve delivery\n\
             4. Optimize for clarity and brevity (70-95 words for body)\n\
             5. List every meaningful change you made and why"
        }
    }
}

fn format_rules(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Review => {
            r#"Respond ONLY with valid JSON in this exact structure:
{
    "overallScore": <number 0-100>,
    "sections": [
        {
            "title": "<section name>",
            "content": "<main feedback>",
            "items": ["<point 1>", "<point 2>"],
            "highlight": {
                "title": "<highlight title>",
                "content": "<key takeaway>"
            }
        }
    ]
}

Sections should include:
- Subject Line Analysis
- Opening Hook
- Value Proposition
- Personalization
- Call to Action
- Length and Structure
- Comparison to Best Performers"#
        }
        TaskKind::Improve => {
            r#"Respond ONLY with valid JSON in this exact structure:
{
    "improvedSubject": "<improved subject line>",
    "improvedBody": "<improved email body>",
    "changes": [
        {
            "category": "<what was changed>",
            "reason": "<why this change improves the copy>"
        }
    ],
    "furtherTips": ["<tip 1>", "<tip 2>"],
    "expectedImpact": "<brief summary of how this should perform better>"
}"#
        }
        TaskKind::AnalyzeAndImprove => {
            r#"Respond ONLY with valid JSON in this exact structure:
{
    "improvedSubject": "<improved subject line>",
    "improvedBody": "<improved email body>",
    "overallScore": <number 0-100 for the ORIGINAL copy>,
    "changes": [
        {
            "category": "<what was changed>",
            "reason": "<why this change improves the copy>"
        }
    ],
    "furtherTips": ["<tip 1>", "<tip 2>"],
    "expectedImpact": "<brief summary of how this should perform better>"
}"#
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// User prompt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn user_prompt(
    kind: TaskKind,
    subject: &str,
    body: &str,
    prior_review: Option<&ReviewResult>,
) -> String {
    match kind {
        TaskKind::Review => format!(
            "Please review this cold email and provide detailed feedback:\n\n\
             ---SUBJECT LINE---\n{subject}\n---END SUBJECT LINE---\n\n\
             ---EMAIL BODY---\n{body}\n---END EMAIL BODY---\n\n\
             Provide your analysis in the JSON format specified."
        ),
        TaskKind::Improve => {
            let feedback = prior_review
                .map(review_feedback_block)
                .unwrap_or_else(|| "No prior review was provided.".to_string());
            format!(
                "Based on the review feedback below, please rewrite this cold email to \
                 maximize response rate.\n\n\
                 ---ORIGINAL SUBJECT LINE---\n{subject}\n---END SUBJECT LINE---\n\n\
                 ---ORIGINAL EMAIL BODY---\n{body}\n---END EMAIL BODY---\n\n\
                 ---REVIEW FEEDBACK---\n{feedback}\n---END REVIEW FEEDBACK---\n\n\
                 Generate an improved version that addresses the feedback and follows best \
                 performing patterns. Provide your response in the JSON format specified."
            )
        }
        TaskKind::AnalyzeAndImprove => format!(
            "Please analyze and rewrite this cold email in one pass:\n\n\
             ---SUBJECT LINE---\n{subject}\n---END SUBJECT LINE---\n\n\
             ---EMAIL BODY---\n{body}\n---END EMAIL BODY---\n\n\
             Provide your response in the JSON format specified."
        ),
    }
}

fn review_feedback_block(review: &ReviewResult) -> String {
    let sections =
        serde_json::to_string_pretty(&review.sections).unwrap_or_else(|_| "[]".to_string());
    format!("Score: {}/100\n{sections}", review.overall_score)
}
