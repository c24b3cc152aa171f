//! `suroo-upstream` — streaming client for the upstream model endpoint.
//!
//! The endpoint accepts `{model, messages, temperature, stream: true}` and
//! answers with a text-event-stream: one `data: <json>` line per token
//! delta (`choices[0].delta.content`), terminated by `data: [DONE]`.
//!
//! Two operations cover both passes of the pipeline:
//! - [`Upstream::collect`] — buffer a full draft response server-side.
//! - [`Upstream::relay`] — forward each delta live as a [`StreamFrame`].

pub mod client;
pub mod sse;

pub use client::{LlmClient, Upstream};
