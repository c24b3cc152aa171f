//! The streaming client for the upstream model endpoint.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use suroo_domain::chat::ChatTurn;
use suroo_domain::config::LlmConfig;
use suroo_domain::stream::{BoxStream, StreamFrame};
use suroo_domain::{Error, Result};

use crate::sse;

/// The two streaming operations the orchestrator needs.
///
/// `collect` is the draft pass: the full text is buffered server-side so
/// the directive parser can run before anything reaches the client.
/// `relay` is the live pass: every delta is forwarded immediately and the
/// stream always ends with exactly one [`StreamFrame::Done`].
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn collect(&self, turns: &[ChatTurn]) -> Result<String>;

    async fn relay(&self, turns: &[ChatTurn]) -> Result<BoxStream<'static, Result<StreamFrame>>>;
}

/// Pooled HTTP client against one chat completions endpoint.
pub struct LlmClient {
    url: String,
    model: String,
    temperature: f64,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(from_reqwest)?;

        Ok(Self {
            url: cfg.url.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            client,
        })
    }

    fn build_payload(&self, turns: &[ChatTurn]) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": turns,
            "temperature": self.temperature,
            "stream": true,
        })
    }

    /// Open the streaming call. Connection failures and non-2xx statuses
    /// are fatal here; everything after a 2xx is handled leniently.
    async fn open_stream(&self, turns: &[ChatTurn]) -> Result<reqwest::Response> {
        let payload = self.build_payload(turns);
        tracing::debug!(url = %self.url, turns = turns.len(), "opening upstream stream");

        let response = self
            .client
            .post(&self.url)
            .header("Accept", "text/event-stream")
            .json(&payload)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Upstream for LlmClient {
    async fn collect(&self, turns: &[ChatTurn]) -> Result<String> {
        let mut response = self.open_stream(turns).await?;
        let mut buffer = String::new();
        let mut text = String::new();

        'read: loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    for line in sse::drain_lines(&mut buffer) {
                        let Some(payload) = sse::data_payload(&line) else {
                            continue;
                        };
                        if payload == sse::DONE_SENTINEL {
                            break 'read;
                        }
                        if let Some(delta) = sse::delta_content(payload) {
                            text.push_str(&delta);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(from_reqwest(e)),
            }
        }

        tracing::debug!(chars = text.len(), "draft collection complete");
        Ok(text)
    }

    async fn relay(&self, turns: &[ChatTurn]) -> Result<BoxStream<'static, Result<StreamFrame>>> {
        let mut response = self.open_stream(turns).await?;

        let stream = async_stream::stream! {
            let mut buffer = String::new();

            'read: loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        for line in sse::drain_lines(&mut buffer) {
                            let Some(payload) = sse::data_payload(&line) else {
                                continue;
                            };
                            if payload == sse::DONE_SENTINEL {
                                break 'read;
                            }
                            if let Some(delta) = sse::delta_content(payload) {
                                yield Ok(StreamFrame::content(delta));
                            }
                        }
                    }
                    Ok(None) => {
                        // Body closed without [DONE]. Flush a trailing
                        // partial line, then terminate normally.
                        if !buffer.is_empty() {
                            if let Some(payload) = sse::data_payload(&buffer) {
                                if payload != sse::DONE_SENTINEL {
                                    if let Some(delta) = sse::delta_content(payload) {
                                        yield Ok(StreamFrame::content(delta));
                                    }
                                }
                            }
                        }
                        break;
                    }
                    Err(e) => {
                        yield Err(from_reqwest(e));
                        break;
                    }
                }
            }

            // The relay contract: every stream ends with one sentinel,
            // whatever happened above.
            yield Ok(StreamFrame::Done);
        };

        Ok(Box::pin(stream))
    }
}

fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Upstream(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
