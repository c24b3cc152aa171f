//! The per-request orchestration state machine.
//!
//! `DRAFTING → (NO_CALLS: DIRECT_STREAM) | (AUTH_DENIED: REFUSED)
//!           | (CALLS: DISPATCHING → FINAL_STREAMING) → DONE`
//!
//! The draft pass is buffered with [`Upstream::collect`]; the direct and
//! final passes relay live. Whatever happens — upstream failure, tool
//! failures, refusal — the outbound frame sequence ends with exactly one
//! terminal sentinel.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;

use suroo_domain::auth::AuthContext;
use suroo_domain::config::AssistantConfig;
use suroo_domain::stream::{BoxStream, StreamFrame};
use suroo_mcp_client::ToolDispatch;
use suroo_upstream::Upstream;

use crate::authz::RestrictedToolSet;
use crate::directive::{DirectiveParser, FunctionCall};
use crate::prompt::{HistorySource, PromptBuilder, HISTORY_WINDOW};
use crate::prompts;
use crate::schema::{norm_lang, ToolSchemas};

/// The FAQ lookup gets its own verbatim-answer template in the final
/// pass. A fixed branch, not a plugin mechanism.
const FAQ_TOOL: &str = "get_faq_by_category";

/// One incoming message plus its request-scoped context.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub message: String,
    pub language: Option<String>,
    pub auth: AuthContext,
    /// Absent id means "no history", not an error.
    pub conversation_id: Option<String>,
}

/// The orchestrator. Shares nothing mutable across requests: schemas,
/// the restricted set and the compiled grammar are read-only, and the
/// upstream/tool clients pool their own connections.
pub struct Assistant<U, T> {
    upstream: U,
    tools: T,
    schemas: ToolSchemas,
    restricted: RestrictedToolSet,
    parser: DirectiveParser,
    history: Option<Arc<dyn HistorySource>>,
    default_language: String,
    history_window: usize,
}

impl<U: Upstream, T: ToolDispatch> Assistant<U, T> {
    pub fn new(upstream: U, tools: T, schemas: ToolSchemas, restricted: RestrictedToolSet) -> Self {
        Self {
            upstream,
            tools,
            schemas,
            restricted,
            parser: DirectiveParser::new(),
            history: None,
            default_language: "ky".into(),
            history_window: HISTORY_WINDOW,
        }
    }

    pub fn from_config(cfg: &AssistantConfig, upstream: U, tools: T, schemas: ToolSchemas) -> Self {
        let restricted = RestrictedToolSet::new(cfg.restricted_tools.iter().cloned());
        Self::new(upstream, tools, schemas, restricted)
            .with_default_language(cfg.default_language.clone())
            .with_history_window(cfg.history_window)
    }

    pub fn with_history(mut self, source: Arc<dyn HistorySource>) -> Self {
        self.history = Some(source);
        self
    }

    pub fn with_default_language(mut self, lang: impl Into<String>) -> Self {
        self.default_language = lang.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// The dispatch client, exposed so the binary can shut it down after
    /// the last response stream is drained.
    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Answer one message as an outbound frame stream.
    pub fn answer_stream(&self, req: AnswerRequest) -> BoxStream<'_, StreamFrame> {
        Box::pin(async_stream::stream! {
            let lang = norm_lang(req.language.as_deref().unwrap_or(&self.default_language));
            let subject = req.auth.subject.clone();

            // ── DRAFTING ─────────────────────────────────────────────
            let history = self.fetch_history(req.conversation_id.as_deref()).await;
            let docs = self.schemas.function_docs(lang);
            let draft_turns = PromptBuilder::new(prompts::base_system_prompt(lang, &docs))
                .with_window(self.history_window)
                .build(&req.message, subject.as_ref(), &history);

            let draft = match self.upstream.collect(&draft_turns).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "draft pass failed");
                    yield StreamFrame::content(prompts::upstream_failure_message(lang));
                    yield StreamFrame::Done;
                    return;
                }
            };
            tracing::info!(chars = draft.len(), "draft collected");

            let bodies = self.parser.extract(&draft);
            let parsed: Vec<suroo_domain::Result<FunctionCall>> =
                bodies.iter().map(|b| self.parser.parse(b)).collect();
            let ok_calls: Vec<FunctionCall> =
                parsed.iter().filter_map(|r| r.as_ref().ok().cloned()).collect();

            // ── AUTH_DENIED: REFUSED ─────────────────────────────────
            // Strictly before any dispatch: a denied request causes zero
            // tool side effects.
            if let Some(denied) = self.restricted.first_denied(&ok_calls, &req.auth) {
                tracing::info!(tool = denied, "restricted tool requested without authentication");
                yield StreamFrame::content(prompts::auth_required_message(lang));
                yield StreamFrame::Done;
                return;
            }

            // ── NO_CALLS: DIRECT_STREAM ──────────────────────────────
            if bodies.is_empty() {
                yield StreamFrame::content(draft);
                yield StreamFrame::Done;
                return;
            }

            // ── DISPATCHING ──────────────────────────────────────────
            // Calls run in extraction order; a failure in one call only
            // fills that call's result slot.
            let mut results: Vec<String> = Vec::with_capacity(parsed.len());
            let mut any_faq = false;

            for outcome in parsed {
                match outcome {
                    Ok(mut call) => {
                        if call.name == FAQ_TOOL {
                            any_faq = true;
                        }
                        if let Some(subject) = &subject {
                            call.args
                                .entry("customer_id")
                                .or_insert(Value::from(subject.id));
                        }
                        call.args
                            .entry("lang")
                            .or_insert(Value::String(lang.to_string()));

                        let args = self.schemas.filter_args(&call.name, lang, &call.args);
                        tracing::info!(tool = %call.name, "dispatching tool call");

                        match self.tools.invoke(&call.name, Value::Object(args)).await {
                            Ok(output) => results.push(output),
                            Err(e) => {
                                tracing::error!(tool = %call.name, error = %e, "tool call failed");
                                results.push(prompts::call_error_placeholder(lang, &e.to_string()));
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "directive parse failed");
                        results.push(prompts::call_error_placeholder(lang, &e.to_string()));
                    }
                }
            }

            let tool_response = results.join("\n");

            // ── FINAL_STREAMING ──────────────────────────────────────
            let user_name = subject.as_ref().map(|s| s.first_name.as_str());
            let system_prompt = if any_faq {
                prompts::faq_system_prompt(lang, user_name, &tool_response)
            } else {
                prompts::tool_response_system_prompt(lang, user_name, &tool_response)
            };
            let final_turns =
                PromptBuilder::new(system_prompt).build(&req.message, subject.as_ref(), &[]);

            let mut frames = match self.upstream.relay(&final_turns).await {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::error!(error = %e, "final pass failed to open");
                    yield StreamFrame::content(prompts::upstream_failure_message(lang));
                    yield StreamFrame::Done;
                    return;
                }
            };

            let mut terminated = false;
            while let Some(item) = frames.next().await {
                match item {
                    Ok(StreamFrame::Done) => {
                        terminated = true;
                        yield StreamFrame::Done;
                        break;
                    }
                    Ok(frame) => yield frame,
                    Err(e) => {
                        tracing::error!(error = %e, "final pass failed mid-stream");
                        yield StreamFrame::content(prompts::upstream_failure_message(lang));
                        terminated = true;
                        yield StreamFrame::Done;
                        break;
                    }
                }
            }
            if !terminated {
                yield StreamFrame::Done;
            }
        })
    }

    async fn fetch_history(&self, conversation_id: Option<&str>) -> Vec<suroo_domain::chat::ChatTurn> {
        let (Some(source), Some(id)) = (&self.history, conversation_id) else {
            return Vec::new();
        };
        match source.recent(id, self.history_window).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(error = %e, "history fetch failed, continuing without history");
                Vec::new()
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
