//! The completion-response ingestion pipeline: turns an untrusted, free-form
//! completion from a remote model into a validated, strongly-shaped result.
//!
//! Flow: provider resolution → model normalization → prompt assembly →
//! invocation → recovery → shape validation, then a fire-and-forget session
//! record that never gates the caller's response.

pub mod prompt;
pub mod recover;
pub mod run;
pub mod validate;

pub use prompt::{build_prompt, AssembledPrompt, KnowledgeBase};
pub use recover::{recover, Recovered};
pub use run::Pipeline;
pub use validate::validate;
