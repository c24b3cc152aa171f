//! `suroo-assistant` — the conversational tool-orchestration pipeline.
//!
//! A user message goes through two upstream passes. The draft pass is
//! fully buffered and scanned for embedded `[FUNC_CALL: ...]` directives.
//! With no directives the draft is forwarded as-is; with directives the
//! calls are authorized, coerced against the per-language tool schemas,
//! dispatched to the tool host, and a second, tool-augmented pass is
//! relayed to the client live. Every path ends with exactly one terminal
//! sentinel frame.

pub mod authz;
pub mod directive;
pub mod pipeline;
pub mod prompt;
pub mod prompts;
pub mod schema;

pub use pipeline::{AnswerRequest, Assistant};
